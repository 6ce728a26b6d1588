//! Error types for backend API calls.

use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by the analysis backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Analysis {id} not found")]
    NotFound { id: String },

    #[error("Server returned error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// Check if retrying the same call could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Timeout { .. } => true,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
