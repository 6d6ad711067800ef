//! The four step executors.

use async_trait::async_trait;
use page_probe::{MarkerSet, PagePort};
use pilot_core_types::{OnboardingStep, PersonalInfo, Timeouts};
use tracing::{debug, instrument, warn};

use crate::errors::FlowError;
use crate::fields::fill_verified;
use crate::poll::wait_for_locator;
use crate::selectors::{
    consent_chains, continue_chain, field_chain, signature_chain, signature_confirm_chain,
    PERSONAL_FIELDS,
};
use crate::strategies::try_strategies;
use crate::verify_machine;

/// Everything an executor needs to drive its step. Passed explicitly so
/// independent orchestration runs never share ambient state.
pub struct StepDeps<'a> {
    pub page: &'a dyn PagePort,
    pub markers: &'a MarkerSet,
    pub timeouts: &'a Timeouts,
}

/// Caller-provided input for a full wizard run.
#[derive(Clone, Debug, Default)]
pub struct RunInput {
    pub personal: PersonalInfo,
    pub skip_verification: bool,
}

#[async_trait]
pub trait StepExecutor: Send + Sync {
    fn step(&self) -> OnboardingStep;
    async fn execute(&self, deps: &StepDeps<'_>) -> Result<(), FlowError>;
}

/// The executors in wizard order for one run.
pub fn executors_for(input: &RunInput) -> Vec<Box<dyn StepExecutor>> {
    vec![
        Box::new(PersonalInfoExecutor {
            info: input.personal.clone(),
        }),
        Box::new(SignatureExecutor {
            signer_name: input.personal.full_name(),
        }),
        Box::new(LegalConsentExecutor),
        Box::new(VerificationExecutor {
            skip: input.skip_verification,
        }),
    ]
}

/// The step's characteristic marker must appear before it can be driven;
/// absence is a hard error for the step.
pub(crate) async fn wait_precondition(
    deps: &StepDeps<'_>,
    step: OnboardingStep,
) -> Result<(), FlowError> {
    let marker = deps.markers.step_marker(step);
    let outcome = wait_for_locator(
        deps.page,
        &marker,
        deps.timeouts.precondition(),
        deps.timeouts.poll_interval(),
    )
    .await;
    if !outcome.satisfied() {
        return Err(FlowError::Precondition {
            step,
            timeout_ms: deps.timeouts.precondition_ms,
        });
    }
    Ok(())
}

/// Locate the progression control, refuse to use it while disabled, click
/// it, and block until the next step's marker appears.
pub(crate) async fn submit_and_wait(
    deps: &StepDeps<'_>,
    step: OnboardingStep,
) -> Result<(), FlowError> {
    let chain = continue_chain(deps.markers);
    let control = try_strategies(deps.page, &chain).await?;

    if deps.page.is_enabled(&control).await? == Some(false) {
        return Err(FlowError::DisabledControl {
            target: chain.target,
        });
    }
    deps.page.click(&control).await?;
    deps.page.settle(deps.timeouts.settle()).await;

    wait_postcondition(deps, step).await
}

/// Block until the next step's marker renders. Distinct from precondition
/// failure so diagnostics can tell "never started" from "started but never
/// finished"; a visible validation banner turns the timeout into a
/// validation error.
pub(crate) async fn wait_postcondition(
    deps: &StepDeps<'_>,
    step: OnboardingStep,
) -> Result<(), FlowError> {
    let next_marker = deps.markers.step_marker(step.next());
    let outcome = wait_for_locator(
        deps.page,
        &next_marker,
        deps.timeouts.postcondition(),
        deps.timeouts.poll_interval(),
    )
    .await;
    if outcome.satisfied() {
        return Ok(());
    }

    let error_locator = page_probe::Locator::css(deps.markers.error_selector.clone());
    if deps.page.exists(&error_locator).await.unwrap_or(false) {
        let message = deps
            .page
            .text_of(&error_locator)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "form reported an error".to_string());
        return Err(FlowError::Validation(message));
    }
    Err(FlowError::StalledAfterSubmit {
        step,
        timeout_ms: deps.timeouts.postcondition_ms,
    })
}

fn personal_value<'a>(info: &'a PersonalInfo, field: &str) -> Option<&'a str> {
    match field {
        "first_name" => Some(info.first_name.as_str()),
        "last_name" => Some(info.last_name.as_str()),
        "date_of_birth" => info.date_of_birth.as_deref(),
        "phone" => info.phone.as_deref(),
        "address_line1" => info.address_line1.as_deref(),
        "city" => info.city.as_deref(),
        "state" => info.state.as_deref(),
        "postal_code" => info.postal_code.as_deref(),
        _ => None,
    }
}

/// Step 1: fill the personal-info form and submit.
pub struct PersonalInfoExecutor {
    pub info: PersonalInfo,
}

#[async_trait]
impl StepExecutor for PersonalInfoExecutor {
    fn step(&self) -> OnboardingStep {
        OnboardingStep::PersonalInfo
    }

    #[instrument(skip_all, fields(step = "personal_info"))]
    async fn execute(&self, deps: &StepDeps<'_>) -> Result<(), FlowError> {
        wait_precondition(deps, self.step()).await?;

        for spec in PERSONAL_FIELDS {
            let value = personal_value(&self.info, spec.name).unwrap_or("");
            if value.is_empty() {
                if spec.required {
                    return Err(FlowError::Validation(format!(
                        "required field '{}' has no input value",
                        spec.name
                    )));
                }
                debug!(field = spec.name, "no value provided, skipping optional field");
                continue;
            }
            fill_verified(deps.page, &field_chain(spec), value, spec.required, deps.timeouts)
                .await?;
        }

        submit_and_wait(deps, self.step()).await
    }
}

/// Step 2: adopt a typed signature and submit.
pub struct SignatureExecutor {
    pub signer_name: String,
}

#[async_trait]
impl StepExecutor for SignatureExecutor {
    fn step(&self) -> OnboardingStep {
        OnboardingStep::Signature
    }

    #[instrument(skip_all, fields(step = "signature"))]
    async fn execute(&self, deps: &StepDeps<'_>) -> Result<(), FlowError> {
        wait_precondition(deps, self.step()).await?;

        fill_verified(
            deps.page,
            &signature_chain(),
            &self.signer_name,
            true,
            deps.timeouts,
        )
        .await?;

        // Some revisions of the form gate submission on an adoption
        // checkbox; absence is fine.
        match try_strategies(deps.page, &signature_confirm_chain()).await {
            Ok(checkbox) => {
                deps.page.click(&checkbox).await?;
                deps.page.settle(deps.timeouts.settle()).await;
            }
            Err(err) => debug!("no signature confirmation control: {err}"),
        }

        submit_and_wait(deps, self.step()).await
    }
}

/// Step 3: tick the consent checkboxes and submit.
pub struct LegalConsentExecutor;

#[async_trait]
impl StepExecutor for LegalConsentExecutor {
    fn step(&self) -> OnboardingStep {
        OnboardingStep::LegalConsent
    }

    #[instrument(skip_all, fields(step = "legal_consent"))]
    async fn execute(&self, deps: &StepDeps<'_>) -> Result<(), FlowError> {
        wait_precondition(deps, self.step()).await?;

        for (chain, required) in consent_chains() {
            match try_strategies(deps.page, &chain).await {
                Ok(checkbox) => {
                    deps.page.click(&checkbox).await?;
                    deps.page.settle(deps.timeouts.settle()).await;
                }
                Err(err) if required => return Err(err),
                Err(err) => debug!(target = %chain.target, "optional consent absent: {err}"),
            }
        }

        submit_and_wait(deps, self.step()).await
    }
}

/// Step 4: drive the identity-verification provider flow through its
/// bounded state machine, or skip it when the wizard offers that.
pub struct VerificationExecutor {
    pub skip: bool,
}

#[async_trait]
impl StepExecutor for VerificationExecutor {
    fn step(&self) -> OnboardingStep {
        OnboardingStep::Verification
    }

    #[instrument(skip_all, fields(step = "verification", skip_requested = self.skip))]
    async fn execute(&self, deps: &StepDeps<'_>) -> Result<(), FlowError> {
        wait_precondition(deps, self.step()).await?;
        if self.skip {
            match verify_machine::skip_verification(deps).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!("skip requested but not available, running verification: {err}")
                }
            }
        }
        verify_machine::run(deps).await
    }
}
