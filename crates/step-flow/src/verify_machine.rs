//! Bounded state machine for the identity-verification step.
//!
//! The remote provider may never resolve; a hard cap on total transitions
//! guarantees the orchestration cannot hang on it.

use page_probe::MarkerSet;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::FlowError;
use crate::executor::StepDeps;
use crate::poll::wait_for_locator;
use crate::selectors::{skip_verification_chain, start_verification_chain};
use crate::strategies::try_strategies;

/// Observable phases of the provider flow, re-read from the DOM after
/// every action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VerifyPhase {
    Loading,
    Pending,
    InProgress,
    RequiresInput,
    Completed,
    Unknown,
}

/// Phase classification from visible page text. Order matters: completion
/// and input-required signals outrank the ambient progress copy.
pub fn classify(body: &str, markers: &MarkerSet) -> VerifyPhase {
    if body.contains(&markers.dashboard_text) || body.contains("Verification complete") {
        VerifyPhase::Completed
    } else if body.contains("Action required") || body.contains("Continue verification") {
        VerifyPhase::RequiresInput
    } else if body.contains("Verification in progress") || body.contains("Verifying") {
        VerifyPhase::InProgress
    } else if body.contains("Start Verification") || body.contains("Verify Identity") {
        VerifyPhase::Pending
    } else if body.contains("Loading") {
        VerifyPhase::Loading
    } else {
        VerifyPhase::Unknown
    }
}

/// Use the wizard's skip control when it is offered.
pub async fn skip_verification(deps: &StepDeps<'_>) -> Result<(), FlowError> {
    let control = try_strategies(deps.page, &skip_verification_chain()).await?;
    deps.page.click(&control).await?;
    deps.page.settle(deps.timeouts.settle()).await;

    let dashboard = deps
        .markers
        .step_marker(pilot_core_types::OnboardingStep::Complete);
    let outcome = wait_for_locator(
        deps.page,
        &dashboard,
        deps.timeouts.postcondition(),
        deps.timeouts.poll_interval(),
    )
    .await;
    if outcome.satisfied() {
        return Ok(());
    }
    Err(FlowError::StalledAfterSubmit {
        step: pilot_core_types::OnboardingStep::Verification,
        timeout_ms: deps.timeouts.postcondition_ms,
    })
}

/// Drive the provider flow until it completes or the transition cap hits.
pub async fn run(deps: &StepDeps<'_>) -> Result<(), FlowError> {
    let cap = deps.timeouts.max_verify_transitions;
    for transition in 1..=cap {
        let body = deps.page.body_text().await?;
        let phase = classify(&body, deps.markers);
        debug!(transition, ?phase, "verification machine");

        match phase {
            VerifyPhase::Completed => return Ok(()),
            VerifyPhase::Pending | VerifyPhase::RequiresInput => {
                match try_strategies(deps.page, &start_verification_chain()).await {
                    Ok(control) => {
                        deps.page.click(&control).await?;
                        deps.page.settle(deps.timeouts.settle()).await;
                    }
                    Err(err) => {
                        // The phase copy is rendered but its control is
                        // not; wait a beat and re-read.
                        warn!("verification control not actionable yet: {err}");
                        sleep(deps.timeouts.poll_interval()).await;
                    }
                }
            }
            VerifyPhase::Loading | VerifyPhase::InProgress | VerifyPhase::Unknown => {
                sleep(deps.timeouts.poll_interval()).await;
            }
        }
    }
    warn!(cap, "verification machine never completed");
    Err(FlowError::TransitionBound(cap))
}
