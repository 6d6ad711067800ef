use async_trait::async_trait;
use pilot_core_types::{OnboardingStep, StepCompletionFlags};
use serde::{Deserialize, Serialize};

use crate::errors::DetectError;

/// Decoded `/api/auth/session` answer. Absence of `user` means
/// unauthenticated even on a 2xx.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReply {
    pub user: Option<serde_json::Value>,
}

impl SessionReply {
    pub fn onboarding_completed(&self) -> bool {
        self.user
            .as_ref()
            .and_then(|user| user.get("onboarding_completed"))
            .and_then(|flag| flag.as_bool())
            .unwrap_or(false)
    }
}

/// Decoded `/api/onboarding/status` answer.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusReply {
    Status {
        server_step: Option<OnboardingStep>,
        is_complete: bool,
        flags: StepCompletionFlags,
    },
    /// The endpoint answered 401; re-run auth detection instead of
    /// assuming step 1.
    AuthenticationRequired,
}

/// The backend as the harness sees it: two read-only JSON endpoints.
#[async_trait]
pub trait ApiPort: Send + Sync {
    async fn fetch_session(&self) -> Result<SessionReply, DetectError>;
    async fn fetch_status(&self) -> Result<StatusReply, DetectError>;
}
