//! Repit Persistence - Database entities and persistence layer
//!
//! This crate provides:
//! - SeaORM entity definitions
//! - Persistence trait abstractions for unified storage
//! - Domain model types for persistence operations
//! - An embedded in-process backend for single-node runs and tests

pub mod embedded;
pub mod entity;
pub mod model;
pub mod sql;
pub mod traits;

use std::sync::Arc;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export persistence traits
pub use traits::{
    AchievementPersistence, GamificationPersistence, LessonPersistence, PersistenceService,
    ProgressPersistence, StudentPersistence,
};

// Re-export backends
pub use embedded::EmbeddedPersistService;
pub use sql::ExternalDbPersistService;

// Re-export model types
pub use model::*;

/// Connect to `db_url` when given, otherwise fall back to the embedded store
pub async fn create_persistence(
    db_url: Option<&str>,
) -> anyhow::Result<Arc<dyn PersistenceService>> {
    match db_url.filter(|url| !url.is_empty()) {
        Some(url) => {
            let db = sea_orm::Database::connect(url).await?;
            tracing::info!("Persistence using external database");
            Ok(Arc::new(ExternalDbPersistService::new(db)))
        }
        None => {
            tracing::info!("Persistence using embedded store");
            Ok(Arc::new(EmbeddedPersistService::new()))
        }
    }
}
