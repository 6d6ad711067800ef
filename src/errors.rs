//! Top-level error type for the harness surface.

use page_probe::ProbeError;
use status_detect::DetectError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no credentials configured; set email and password to authenticate")]
    MissingCredentials,

    #[error("authentication did not produce a session within {timeout_ms}ms")]
    AuthenticationFailed { timeout_ms: u64 },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Page(#[from] ProbeError),

    #[error(transparent)]
    Api(#[from] DetectError),

    #[error("artifact write failed: {0}")]
    Artifact(#[from] std::io::Error),
}
