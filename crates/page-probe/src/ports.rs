use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::ProbeError;

/// How to find an element on the page.
///
/// The wizard's test hooks are inconsistent across refactors, so callers
/// hold ordered lists of semantically-equivalent locators rather than one
/// brittle selector; the port only knows how to try a single one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Locator {
    /// Direct CSS selector.
    Css(String),
    /// Input associated with a visible label or placeholder text.
    Labelled(String),
    /// Element whose visible text contains (or equals) the content.
    Text { content: String, exact: bool },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn labelled(label: impl Into<String>) -> Self {
        Locator::Labelled(label.into())
    }

    pub fn text(content: impl Into<String>) -> Self {
        Locator::Text {
            content: content.into(),
            exact: false,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(sel) => write!(f, "css:{sel}"),
            Locator::Labelled(label) => write!(f, "label:{label}"),
            Locator::Text { content, exact } => write!(f, "text:{content} (exact={exact})"),
        }
    }
}

/// The live page as the harness sees it. One implementation drives a real
/// browser over CDP; the scripted fake backs tests.
#[async_trait]
pub trait PagePort: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ProbeError>;
    async fn reload(&self) -> Result<(), ProbeError>;
    async fn current_url(&self) -> Result<String, ProbeError>;

    /// Full visible text of the page body.
    async fn body_text(&self) -> Result<String, ProbeError>;

    async fn exists(&self, locator: &Locator) -> Result<bool, ProbeError>;
    async fn is_visible(&self, locator: &Locator) -> Result<bool, ProbeError>;
    /// `None` when the element has no disabled semantics (e.g. a heading).
    async fn is_enabled(&self, locator: &Locator) -> Result<Option<bool>, ProbeError>;
    async fn text_of(&self, locator: &Locator) -> Result<Option<String>, ProbeError>;

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), ProbeError>;
    async fn read_value(&self, locator: &Locator) -> Result<Option<String>, ProbeError>;
    async fn click(&self, locator: &Locator) -> Result<(), ProbeError>;

    /// Run a script in the page, for the recovery engine's nudges.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ProbeError>;

    async fn screenshot(&self) -> Result<Vec<u8>, ProbeError>;

    /// Fixed short delay for framework re-renders after a mutation.
    async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
