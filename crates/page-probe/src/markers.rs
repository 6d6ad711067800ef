use pilot_core_types::OnboardingStep;
use serde::{Deserialize, Serialize};

use crate::ports::Locator;

/// The DOM markers each wizard step renders, kept as data so a
/// false-positive marker can be corrected without touching resolver or
/// executor logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerSet {
    /// Heading text unique to each step.
    pub signature_heading: String,
    pub legal_heading: String,
    pub verification_heading: String,
    /// The personal-info step has no reliable heading; its marker is the
    /// form input set.
    pub personal_form_selector: String,
    pub dashboard_text: String,
    pub error_selector: String,
    pub spinner_selector: String,
    pub continue_label: String,
    pub complete_label: String,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            signature_heading: "Signature".to_string(),
            legal_heading: "Legal".to_string(),
            verification_heading: "Identity Verification".to_string(),
            personal_form_selector: "form input[name='first_name']".to_string(),
            dashboard_text: "Your Estate Plan".to_string(),
            error_selector: "[role='alert'], .error-message".to_string(),
            spinner_selector: "[data-loading], .spinner".to_string(),
            continue_label: "Continue".to_string(),
            complete_label: "Complete".to_string(),
        }
    }
}

impl MarkerSet {
    /// The characteristic marker that must appear before a step can be
    /// driven, and that confirms the step is the one rendered.
    pub fn step_marker(&self, step: OnboardingStep) -> Locator {
        match step {
            OnboardingStep::PersonalInfo | OnboardingStep::NotStarted => {
                Locator::css(self.personal_form_selector.clone())
            }
            OnboardingStep::Signature => Locator::text(self.signature_heading.clone()),
            OnboardingStep::LegalConsent => Locator::text(self.legal_heading.clone()),
            OnboardingStep::Verification => Locator::text(self.verification_heading.clone()),
            OnboardingStep::Complete => Locator::text(self.dashboard_text.clone()),
        }
    }

    /// Heading-based content checks against the full body text. Used by
    /// the snapshot reader so one body read answers all step questions.
    pub fn step_in_text(&self, step: OnboardingStep, body: &str) -> bool {
        match step {
            OnboardingStep::Signature => body.contains(&self.signature_heading),
            OnboardingStep::LegalConsent => body.contains(&self.legal_heading),
            OnboardingStep::Verification => body.contains(&self.verification_heading),
            OnboardingStep::Complete => body.contains(&self.dashboard_text),
            _ => false,
        }
    }
}
