use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry policy shared by both detectors: a small fixed attempt
/// count, a per-attempt timeout, and linear backoff between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub attempt_timeout_ms: u64,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            attempt_timeout_ms: 10_000,
            backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Wait budgets for the UI side. Every wait in the harness is bounded; a
/// hit budget becomes a reported failure, never a hang.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Short settle delay after mutations, for framework re-renders.
    pub settle_ms: u64,
    /// How long a step's own marker may take to appear.
    pub precondition_ms: u64,
    /// How long the next step's marker may take after submission.
    pub postcondition_ms: u64,
    /// Poll interval inside bounded waits.
    pub poll_interval_ms: u64,
    /// Hard cap on verification state-machine transitions.
    pub max_verify_transitions: u32,
    /// Attempts for the fill-then-read-back loop on one field.
    pub fill_attempts: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            settle_ms: 400,
            precondition_ms: 10_000,
            postcondition_ms: 15_000,
            poll_interval_ms: 250,
            max_verify_transitions: 10,
            fill_attempts: 3,
        }
    }
}

impl Timeouts {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn precondition(&self) -> Duration {
        Duration::from_millis(self.precondition_ms)
    }

    pub fn postcondition(&self) -> Duration {
        Duration::from_millis(self.postcondition_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
