use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::ErrorTag;
use crate::state::{PageSnapshot, ResolvedState};
use crate::step::OnboardingStep;
use crate::RunId;

/// Wizard input for the personal-info step. Required fields fail the step
/// when they cannot be filled; optional fields only log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl PersonalInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Outcome of one executor invocation. Appended to the run report in
/// order; never overwritten.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed,
    Recovered,
    Uncertain,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: OnboardingStep,
    pub status: StepStatus,
    /// True only when an independent signal confirmed progression, never
    /// merely "the click didn't throw".
    pub verified: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn skipped(step: OnboardingStep) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            verified: true,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn is_acceptable(&self) -> bool {
        matches!(
            self.status,
            StepStatus::Completed | StepStatus::Skipped | StepStatus::Recovered
        )
    }
}

/// Failure diagnostics for human debugging. Beyond tag dispatch in the
/// recovery engine, nothing downstream consumes this.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosticsRecord {
    pub timestamp: DateTime<Utc>,
    pub step: OnboardingStep,
    pub error_message: String,
    pub tags: BTreeSet<ErrorTag>,
    pub snapshot: PageSnapshot,
    pub dom_analysis: serde_json::Value,
    pub screenshot_ref: Option<String>,
}

/// Final product of one orchestration run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub success: bool,
    pub needs_authentication: bool,
    pub already_complete: bool,
    pub steps: Vec<StepResult>,
    pub final_state: Option<ResolvedState>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn begin(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            success: false,
            needs_authentication: false,
            already_complete: false,
            steps: Vec::new(),
            final_state: None,
            warnings: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptable_statuses() {
        let mut result = StepResult::skipped(OnboardingStep::Signature);
        assert!(result.is_acceptable());
        result.status = StepStatus::Recovered;
        assert!(result.is_acceptable());
        result.status = StepStatus::Failed;
        assert!(!result.is_acceptable());
        result.status = StepStatus::Uncertain;
        assert!(!result.is_acceptable());
    }

    #[test]
    fn personal_info_full_name_trims() {
        let info = PersonalInfo {
            first_name: " Jane ".into(),
            last_name: "Smith".into(),
            ..PersonalInfo::default()
        };
        assert_eq!(info.full_name(), "Jane Smith");
    }
}
