//! Error type for the page surface

use pilot_core_types::{classify_error_text, ErrorTag};
use thiserror::Error;

/// Probe error enumeration
#[derive(Debug, Error, Clone)]
pub enum ProbeError {
    /// No element matched the locator
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Browser/driver layer failure (opaque message)
    #[error("Browser error: {0}")]
    Browser(String),

    /// Navigation did not complete
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Bounded wait elapsed
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Script evaluation failed
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

impl ProbeError {
    /// Recovery dispatch tag. Browser-layer strings fall back to keyword
    /// classification since their kind is set outside our control.
    pub fn tag(&self) -> ErrorTag {
        match self {
            ProbeError::ElementNotFound(_) => ErrorTag::ElementNotFound,
            ProbeError::Navigation(_) => ErrorTag::NavigationError,
            ProbeError::Timeout(_) => ErrorTag::Timeout,
            ProbeError::Evaluation(msg) | ProbeError::Browser(msg) => classify_error_text(msg)
                .into_iter()
                .next()
                .unwrap_or(ErrorTag::Unknown),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeError::Timeout(_) | ProbeError::Browser(_))
    }
}
