use serde::{Deserialize, Serialize};

use crate::step::OnboardingStep;

/// Whether a detector's underlying API call ultimately succeeded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    Success,
    Failed,
}

/// Output of the Authentication State Detector. Recomputed fresh on every
/// resolution cycle; never persisted across cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub onboarding_completed: bool,
    /// Opaque user record from the session endpoint, when present.
    pub user: Option<serde_json::Value>,
    pub api_status: ApiStatus,
    /// Set when authentication was inferred from rendered content while the
    /// session API was failing.
    pub warning: Option<String>,
}

impl AuthState {
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            onboarding_completed: false,
            user: None,
            api_status: ApiStatus::Failed,
            warning: None,
        }
    }

    pub fn needs_authentication(&self) -> bool {
        !self.is_authenticated
    }
}

/// Per-step completion flags persisted server-side.
///
/// A value of this type only exists when the status API answered; a failed
/// fetch yields `None` upstream so that "unknown" can never be mistaken for
/// "nothing done".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StepCompletionFlags {
    pub personal_info: bool,
    pub signature: bool,
    pub legal_consent: bool,
    pub verification: bool,
}

impl StepCompletionFlags {
    /// First incomplete step in wizard order, or `Complete` if every flag
    /// is set.
    pub fn first_incomplete(&self) -> OnboardingStep {
        if !self.personal_info {
            OnboardingStep::PersonalInfo
        } else if !self.signature {
            OnboardingStep::Signature
        } else if !self.legal_consent {
            OnboardingStep::LegalConsent
        } else if !self.verification {
            OnboardingStep::Verification
        } else {
            OnboardingStep::Complete
        }
    }

    pub fn is_complete(&self, step: OnboardingStep) -> bool {
        match step {
            OnboardingStep::PersonalInfo => self.personal_info,
            OnboardingStep::Signature => self.signature,
            OnboardingStep::LegalConsent => self.legal_consent,
            OnboardingStep::Verification => self.verification,
            OnboardingStep::NotStarted => false,
            OnboardingStep::Complete => self.first_incomplete() == OnboardingStep::Complete,
        }
    }
}

/// Output of the Onboarding Status Detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnboardingStatus {
    pub flags: Option<StepCompletionFlags>,
    pub server_step: Option<OnboardingStep>,
    pub is_complete: bool,
    pub api_status: ApiStatus,
    /// The endpoint answered 401; the resolver must re-run auth detection
    /// instead of assuming step 1.
    pub auth_required: bool,
}

impl OnboardingStatus {
    pub fn unavailable() -> Self {
        Self {
            flags: None,
            server_step: None,
            is_complete: false,
            api_status: ApiStatus::Failed,
            auth_required: false,
        }
    }
}

/// DOM-observable facts, read fresh on every call and never cached across
/// UI mutations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub pathname: String,
    pub step_title: Option<String>,
    pub has_personal_form: bool,
    pub has_signature_content: bool,
    pub has_legal_content: bool,
    pub has_verification_content: bool,
    pub has_dashboard_marker: bool,
    pub has_errors: bool,
    pub error_messages: Vec<String>,
    pub has_spinner: bool,
    pub has_continue_button: bool,
    pub has_complete_button: bool,
    /// Internal read failure. The reader never propagates exceptions, so a
    /// failed probe surfaces here instead.
    pub error: Option<String>,
}

impl PageSnapshot {
    /// Step suggested by content markers alone, in fixed precedence:
    /// verification > legal > signature > personal info.
    pub fn marker_step(&self) -> Option<OnboardingStep> {
        if self.has_verification_content {
            Some(OnboardingStep::Verification)
        } else if self.has_legal_content {
            Some(OnboardingStep::LegalConsent)
        } else if self.has_signature_content {
            Some(OnboardingStep::Signature)
        } else if self.has_personal_form {
            Some(OnboardingStep::PersonalInfo)
        } else {
            None
        }
    }
}

/// The single merged belief about current progress, recomputed after every
/// executor run and never mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedState {
    pub current_step: OnboardingStep,
    pub is_complete: bool,
    pub can_resume_from: OnboardingStep,
    pub auth: AuthState,
    pub status: OnboardingStatus,
    pub snapshot: PageSnapshot,
    pub warnings: Vec<String>,
}

impl ResolvedState {
    pub fn needs_authentication(&self) -> bool {
        self.current_step == OnboardingStep::NotStarted
    }
}
