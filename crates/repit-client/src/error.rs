//! Client error types for calling Repit services

/// Error type for service client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("service returned error: status={status}, body={body}")]
    Api { status: u16, body: String },

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Errors a caller may paper over with a local fallback
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::ServiceUnavailable(_) | ClientError::Api { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
