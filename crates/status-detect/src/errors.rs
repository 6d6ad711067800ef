//! Error type for API detection

use pilot_core_types::ErrorTag;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    /// Endpoint unreachable or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx answer other than the 401 re-auth signal
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Per-attempt timeout elapsed
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

impl DetectError {
    pub fn tag(&self) -> ErrorTag {
        match self {
            DetectError::Network(_) | DetectError::Http { .. } | DetectError::Decode(_) => {
                ErrorTag::NetworkError
            }
            DetectError::Timeout(_) => ErrorTag::Timeout,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            DetectError::Network(_) | DetectError::Timeout(_) => true,
            DetectError::Http { status, .. } => *status >= 500,
            DetectError::Decode(_) => false,
        }
    }
}
