use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Recovery dispatch tags. Populated at the throw site for errors the
/// harness raises itself; keyword classification is the fallback for
/// strings surfaced by the opaque browser layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTag {
    Timeout,
    ElementNotFound,
    ValidationError,
    NavigationError,
    NetworkError,
    AuthError,
    TerminationBound,
    Unknown,
}

impl ErrorTag {
    pub fn name(self) -> &'static str {
        match self {
            ErrorTag::Timeout => "timeout",
            ErrorTag::ElementNotFound => "element-not-found",
            ErrorTag::ValidationError => "validation-error",
            ErrorTag::NavigationError => "navigation-error",
            ErrorTag::NetworkError => "network-error",
            ErrorTag::AuthError => "auth-error",
            ErrorTag::TerminationBound => "termination-bound",
            ErrorTag::Unknown => "unknown",
        }
    }
}

/// Keyword classification of an opaque error string into tags.
///
/// Only a heuristic: typed errors carry their tag directly and never go
/// through here.
pub fn classify_error_text(text: &str) -> BTreeSet<ErrorTag> {
    let lower = text.to_ascii_lowercase();
    let mut tags = BTreeSet::new();

    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("deadline") {
        tags.insert(ErrorTag::Timeout);
    }
    if lower.contains("not found")
        || lower.contains("no element")
        || lower.contains("no node")
        || lower.contains("detached")
        || lower.contains("selector")
    {
        tags.insert(ErrorTag::ElementNotFound);
    }
    if lower.contains("validation") || lower.contains("invalid") || lower.contains("required field")
    {
        tags.insert(ErrorTag::ValidationError);
    }
    if lower.contains("navigation") || lower.contains("navigate") || lower.contains("redirect") {
        tags.insert(ErrorTag::NavigationError);
    }
    if lower.contains("network")
        || lower.contains("connection")
        || lower.contains("fetch")
        || lower.contains("socket")
    {
        tags.insert(ErrorTag::NetworkError);
    }
    if lower.contains("401")
        || lower.contains("unauthorized")
        || lower.contains("unauthenticated")
        || lower.contains("session expired")
    {
        tags.insert(ErrorTag::AuthError);
    }

    if tags.is_empty() {
        tags.insert(ErrorTag::Unknown);
    }
    tags
}
