//! Repit Client - SDK for calling Repit platform services
//!
//! This crate provides:
//! - Service URL resolution through the API gateway or direct addresses
//! - HTTP client with retries, per-service circuit breakers and health checks
//! - Typed student service client, including XP awards and leaderboards
//! - Typed analytics client with report downloads
//! - Fallback-aware student integration for bot front ends

pub mod analytics;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod http;
pub mod integration;
pub mod registry;
pub mod student;

// Re-export commonly used types
pub use analytics::{
    ANALYTICS_SERVICE, AnalyticsServiceClient, DownloadedReport, LessonScope, statistics_message,
};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager, CircuitMetrics, CircuitState,
};
pub use config::{SERVICES, ServiceClientConfig};
pub use error::{ClientError, Result};
pub use http::{ServiceHttpClient, parse_body};
pub use integration::{
    AchievementDigest, DashboardView, StreakUpdate, StudentIntegration, XpResult,
    default_profile, group_by_rarity, with_fallback,
};
pub use registry::{HealthStatus, ServiceHealth, ServiceRegistry};
pub use student::{STUDENT_SERVICE, StudentServiceClient};
