//! Error types for step execution

use page_probe::ProbeError;
use pilot_core_types::{ErrorTag, OnboardingStep};
use thiserror::Error;

/// Step execution error enumeration. The tag drives recovery dispatch.
#[derive(Debug, Error, Clone)]
pub enum FlowError {
    /// The step's own marker never rendered: the step never started.
    #[error("{step} marker never appeared within {timeout_ms}ms")]
    Precondition {
        step: OnboardingStep,
        timeout_ms: u64,
    },

    /// The step was driven but the next step never rendered: started but
    /// never finished. Kept distinct from `Precondition` for diagnostics.
    #[error("no progression after submitting {step} within {timeout_ms}ms")]
    StalledAfterSubmit {
        step: OnboardingStep,
        timeout_ms: u64,
    },

    /// Every selector strategy for the target failed.
    #[error("no strategy located '{target}'")]
    ElementNotFound { target: String },

    /// The value did not stick after the bounded fill-and-verify loop.
    #[error("field '{field}' did not accept its value after {attempts} attempts")]
    FieldMismatch { field: String, attempts: u32 },

    /// Submitting through a disabled control is a logic error, not retried.
    #[error("refusing to submit via disabled control '{target}'")]
    DisabledControl { target: String },

    /// Client-side validation rejected the submission.
    #[error("validation rejected the form: {0}")]
    Validation(String),

    /// The verification state machine hit its hard transition cap.
    #[error("verification machine exceeded {0} transitions")]
    TransitionBound(u32),

    /// Failure surfaced by the page layer.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl FlowError {
    pub fn tag(&self) -> ErrorTag {
        match self {
            FlowError::Precondition { .. } | FlowError::ElementNotFound { .. } => {
                ErrorTag::ElementNotFound
            }
            FlowError::StalledAfterSubmit { .. } => ErrorTag::NavigationError,
            FlowError::FieldMismatch { .. }
            | FlowError::Validation(_)
            | FlowError::DisabledControl { .. } => ErrorTag::ValidationError,
            FlowError::TransitionBound(_) => ErrorTag::TerminationBound,
            FlowError::Probe(err) => err.tag(),
        }
    }
}
