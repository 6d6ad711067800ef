use serde::{Deserialize, Serialize};
use std::fmt;

/// The four wizard steps plus the two boundary states the resolver can
/// produce: `NotStarted` (authentication still required) and `Complete`.
///
/// Ordering is the wizard's causal order; the resolver never legitimately
/// regresses a user from a higher to a lower step within one run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    NotStarted,
    PersonalInfo,
    Signature,
    LegalConsent,
    Verification,
    Complete,
}

impl OnboardingStep {
    /// Wire-level index as the status API reports it (1..=5, 0 sentinel).
    pub fn as_index(self) -> u8 {
        match self {
            OnboardingStep::NotStarted => 0,
            OnboardingStep::PersonalInfo => 1,
            OnboardingStep::Signature => 2,
            OnboardingStep::LegalConsent => 3,
            OnboardingStep::Verification => 4,
            OnboardingStep::Complete => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(OnboardingStep::NotStarted),
            1 => Some(OnboardingStep::PersonalInfo),
            2 => Some(OnboardingStep::Signature),
            3 => Some(OnboardingStep::LegalConsent),
            4 => Some(OnboardingStep::Verification),
            5 => Some(OnboardingStep::Complete),
            _ => None,
        }
    }

    /// The step the wizard navigates to after this one is submitted.
    pub fn next(self) -> Self {
        match self {
            OnboardingStep::NotStarted => OnboardingStep::PersonalInfo,
            OnboardingStep::PersonalInfo => OnboardingStep::Signature,
            OnboardingStep::Signature => OnboardingStep::LegalConsent,
            OnboardingStep::LegalConsent => OnboardingStep::Verification,
            OnboardingStep::Verification | OnboardingStep::Complete => OnboardingStep::Complete,
        }
    }

    /// The four executable steps, in wizard order.
    pub fn wizard_steps() -> [Self; 4] {
        [
            OnboardingStep::PersonalInfo,
            OnboardingStep::Signature,
            OnboardingStep::LegalConsent,
            OnboardingStep::Verification,
        ]
    }

    /// Absolute distance between two steps, used by the resolver's
    /// cross-validation tolerance check.
    pub fn distance(self, other: Self) -> u8 {
        self.as_index().abs_diff(other.as_index())
    }

    pub fn title(self) -> &'static str {
        match self {
            OnboardingStep::NotStarted => "Not Started",
            OnboardingStep::PersonalInfo => "Personal Information",
            OnboardingStep::Signature => "Signature",
            OnboardingStep::LegalConsent => "Legal Consent",
            OnboardingStep::Verification => "Identity Verification",
            OnboardingStep::Complete => "Complete",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.as_index(), self.title())
    }
}
