//! Persistence traits for the unified storage abstraction layer
//!
//! This module defines the core persistence traits that abstract over the
//! storage backends: external database (MySQL/PostgreSQL) and the embedded
//! in-process store.

pub mod achievement;
pub mod gamification;
pub mod lesson;
pub mod progress;
pub mod student;

pub use achievement::AchievementPersistence;
pub use gamification::GamificationPersistence;
pub use lesson::LessonPersistence;
pub use progress::ProgressPersistence;
pub use student::StudentPersistence;

use async_trait::async_trait;

use crate::model::StorageMode;

/// Unified persistence service trait
///
/// This is the main interface for all storage operations. Services hold an
/// `Arc<dyn PersistenceService>` and never see the concrete backend.
#[async_trait]
pub trait PersistenceService:
    StudentPersistence
    + AchievementPersistence
    + GamificationPersistence
    + LessonPersistence
    + ProgressPersistence
    + Send
    + Sync
{
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
