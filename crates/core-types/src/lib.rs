//! Shared primitives for the onboard-pilot harness.
//!
//! Everything that crosses a crate boundary lives here: the wizard step
//! enum, the detector outputs, the page snapshot, the resolved state the
//! orchestrator loops over, and the error-tag taxonomy recovery dispatches
//! on.

mod errors;
mod policy;
mod report;
mod state;
mod step;

pub use errors::{classify_error_text, ErrorTag};
pub use policy::{RetryPolicy, Timeouts};
pub use report::{DiagnosticsRecord, PersonalInfo, RunReport, StepResult, StepStatus};
pub use state::{ApiStatus, AuthState, OnboardingStatus, PageSnapshot, ResolvedState, StepCompletionFlags};
pub use step::OnboardingStep;

use uuid::Uuid;

/// Identifier for one orchestration run, threaded through logs and reports.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
