// Repit REST server: student gamification and lesson analytics over HTTP

pub mod api; // REST handlers and request models
pub mod error; // Error mapping to HTTP responses
pub mod metrics; // Prometheus metrics
pub mod middleware; // HTTP middleware
pub mod model; // Configuration, shared state and response envelope
pub mod startup; // Logging and server assembly

pub use model::common::{AppState, Configuration};
