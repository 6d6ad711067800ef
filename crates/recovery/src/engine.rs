use std::path::Path;

use page_probe::{MarkerSet, PagePort, SnapshotReader};
use pilot_core_types::{
    DiagnosticsRecord, ErrorTag, OnboardingStep, ResolvedState, RetryPolicy, Timeouts,
};
use status_detect::ApiPort;
use step_flow::selectors::{any_progression_chain, field_chain, signature_chain, PERSONAL_FIELDS};
use step_flow::{try_strategies, wait_for_locator, FlowError};
use step_resolver::StepResolver;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::diagnostics::capture_diagnostics;
use crate::synthetic::synthetic_value;

const NUDGE_SCRIPT: &str =
    "window.scrollTo(0, 0); window.dispatchEvent(new Event('resize')); true";
const OVERLAY_SCRIPT: &str = "document.querySelectorAll(\
     '[data-overlay], .modal-backdrop, [aria-modal=\"true\"]')\
     .forEach(el => el.remove()); true";

pub struct RecoveryOutcome {
    pub recovered: bool,
    pub state: ResolvedState,
    pub diagnostics: DiagnosticsRecord,
}

/// Three-phase recovery: diagnose, tag-specific correction, then the
/// forced-progression fallback ladder. Every phase does bounded work.
pub struct RecoveryEngine<'a> {
    pub page: &'a dyn PagePort,
    pub api: &'a dyn ApiPort,
    pub reader: &'a SnapshotReader,
    pub markers: &'a MarkerSet,
    pub timeouts: &'a Timeouts,
    pub policy: &'a RetryPolicy,
    pub base_url: &'a Url,
    pub artifact_dir: Option<&'a Path>,
}

impl RecoveryEngine<'_> {
    #[instrument(skip_all, fields(step = %step, tag = error.tag().name()))]
    pub async fn recover(&self, error: &FlowError, step: OnboardingStep) -> RecoveryOutcome {
        let tag = error.tag();
        let diagnostics = capture_diagnostics(
            self.page,
            self.reader,
            step,
            tag,
            &error.to_string(),
            self.artifact_dir,
        )
        .await;
        info!(tags = ?diagnostics.tags, "attempting recovery");

        self.correct(tag, step).await;
        let state = self.resolve().await;
        if self.made_progress(&state, step) {
            info!(now_at = %state.current_step, "correction recovered the run");
            return RecoveryOutcome {
                recovered: true,
                state,
                diagnostics,
            };
        }

        debug!("correction made no measurable difference, trying fallback ladder");
        self.fallback(step).await;
        let state = self.resolve().await;
        let recovered = self.made_progress(&state, step);
        if recovered {
            info!(now_at = %state.current_step, "fallback recovered the run");
        } else {
            warn!("recovery exhausted without progress");
        }
        RecoveryOutcome {
            recovered,
            state,
            diagnostics,
        }
    }

    async fn resolve(&self) -> ResolvedState {
        StepResolver {
            page: self.page,
            api: self.api,
            reader: self.reader,
            policy: self.policy,
        }
        .resolve()
        .await
    }

    /// Progress means the resolved step advanced, or the failing step's
    /// marker is back on screen with no error banner.
    fn made_progress(&self, state: &ResolvedState, step: OnboardingStep) -> bool {
        if state.is_complete || state.current_step > step {
            return true;
        }
        state.snapshot.marker_step() == Some(step) && !state.snapshot.has_errors
    }

    async fn correct(&self, tag: ErrorTag, step: OnboardingStep) {
        match tag {
            ErrorTag::Timeout => {
                debug!("timeout correction: wait and re-check the step marker");
                wait_for_locator(
                    self.page,
                    &self.markers.step_marker(step),
                    self.timeouts.precondition(),
                    self.timeouts.poll_interval(),
                )
                .await;
            }
            ErrorTag::ElementNotFound => {
                debug!("missing-element correction: layout nudge");
                if let Err(err) = self.page.evaluate(NUDGE_SCRIPT).await {
                    warn!("nudge script failed: {err}");
                }
                self.page.settle(self.timeouts.settle()).await;
            }
            ErrorTag::ValidationError => {
                debug!("validation correction: clear and refill with synthetic values");
                self.refill_step_fields(step).await;
            }
            ErrorTag::NavigationError => {
                debug!("navigation correction: full reload");
                if let Err(err) = self.page.reload().await {
                    warn!("reload failed: {err}");
                }
                self.page.settle(self.timeouts.settle()).await;
            }
            ErrorTag::NetworkError => {
                debug!("network correction: backoff before re-reading state");
                sleep(self.policy.backoff()).await;
            }
            ErrorTag::AuthError => {
                // Nothing to correct client-side; the re-resolution will
                // surface the needs-authentication state.
            }
            ErrorTag::TerminationBound | ErrorTag::Unknown => {
                debug!("catch-all correction: remove blocking overlays");
                if let Err(err) = self.page.evaluate(OVERLAY_SCRIPT).await {
                    warn!("overlay script failed: {err}");
                }
                self.page.settle(self.timeouts.settle()).await;
            }
        }
    }

    async fn refill_step_fields(&self, step: OnboardingStep) {
        match step {
            OnboardingStep::PersonalInfo => {
                for spec in PERSONAL_FIELDS {
                    let chain = field_chain(spec);
                    let Ok(locator) = try_strategies(self.page, &chain).await else {
                        continue;
                    };
                    let current = self
                        .page
                        .read_value(&locator)
                        .await
                        .ok()
                        .flatten()
                        .unwrap_or_default();
                    if current.trim().is_empty() {
                        let value = synthetic_value(spec.name);
                        debug!(field = spec.name, value, "refilling empty field");
                        if let Err(err) = self.page.fill(&locator, value).await {
                            warn!(field = spec.name, "refill failed: {err}");
                        }
                    }
                }
            }
            OnboardingStep::Signature => {
                if let Ok(locator) = try_strategies(self.page, &signature_chain()).await {
                    if let Err(err) = self.page.fill(&locator, synthetic_value("signature")).await {
                        warn!("signature refill failed: {err}");
                    }
                }
            }
            _ => {}
        }
        self.page.settle(self.timeouts.settle()).await;
    }

    /// Forced progression: click anything progression-labeled, else jump
    /// straight to the next step's URL, else reload.
    async fn fallback(&self, step: OnboardingStep) {
        if let Ok(control) = try_strategies(self.page, &any_progression_chain(self.markers)).await {
            debug!(%control, "fallback: clicking progression control");
            if self.page.click(&control).await.is_ok() {
                self.page.settle(self.timeouts.settle()).await;
                return;
            }
        }

        let next = step.next();
        if next != OnboardingStep::Complete {
            if let Ok(mut target) = self.base_url.join("/onboarding") {
                target.set_query(Some(&format!("step={}", next.as_index())));
                debug!(%target, "fallback: direct navigation");
                if self.page.navigate(target.as_str()).await.is_ok() {
                    self.page.settle(self.timeouts.settle()).await;
                    return;
                }
            }
        }

        debug!("fallback: reload");
        if let Err(err) = self.page.reload().await {
            warn!("fallback reload failed: {err}");
        }
        self.page.settle(self.timeouts.settle()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use page_probe::fake::{Scene, ScriptedPage};
    use page_probe::Locator;
    use pilot_core_types::StepCompletionFlags;
    use status_detect::{DetectError, SessionReply, StatusReply};

    struct StuckApi {
        step: OnboardingStep,
    }

    #[async_trait]
    impl ApiPort for StuckApi {
        async fn fetch_session(&self) -> Result<SessionReply, DetectError> {
            Ok(SessionReply {
                user: Some(serde_json::json!({ "onboarding_completed": false })),
            })
        }

        async fn fetch_status(&self) -> Result<StatusReply, DetectError> {
            Ok(StatusReply::Status {
                server_step: Some(self.step),
                is_complete: false,
                flags: StepCompletionFlags::default(),
            })
        }
    }

    fn fast_timeouts() -> Timeouts {
        Timeouts {
            settle_ms: 0,
            precondition_ms: 50,
            postcondition_ms: 50,
            poll_interval_ms: 5,
            max_verify_transitions: 10,
            fill_attempts: 3,
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 1,
            attempt_timeout_ms: 50,
            backoff_ms: 1,
        }
    }

    fn engine<'a>(
        page: &'a ScriptedPage,
        api: &'a StuckApi,
        reader: &'a SnapshotReader,
        markers: &'a MarkerSet,
        timeouts: &'a Timeouts,
        policy: &'a RetryPolicy,
        base: &'a Url,
    ) -> RecoveryEngine<'a> {
        RecoveryEngine {
            page,
            api,
            reader,
            markers,
            timeouts,
            policy,
            base_url: base,
            artifact_dir: None,
        }
    }

    #[tokio::test]
    async fn unrecoverable_element_not_found_terminates_with_failure() {
        // P6: nothing on the page changes; recovery must return, not hang.
        let page = ScriptedPage::single("https://x.test/onboarding?step=2", "nothing here");
        let api = StuckApi {
            step: OnboardingStep::Signature,
        };
        let markers = MarkerSet::default();
        let timeouts = fast_timeouts();
        let policy = fast_policy();
        let reader = SnapshotReader::new(markers.clone(), timeouts);
        let base = Url::parse("https://x.test").unwrap();

        let outcome = engine(&page, &api, &reader, &markers, &timeouts, &policy, &base)
            .recover(
                &FlowError::ElementNotFound {
                    target: "signature input".into(),
                },
                OnboardingStep::Signature,
            )
            .await;

        assert!(!outcome.recovered);
        assert!(outcome
            .diagnostics
            .tags
            .contains(&ErrorTag::ElementNotFound));
        // The nudge and the fallback direct-navigation both ran.
        assert!(!page.scripts().is_empty());
    }

    #[tokio::test]
    async fn validation_correction_refills_empty_fields() {
        let phone = Locator::css("input[name='phone']");
        let page = ScriptedPage::new(vec![Scene::new(
            "https://x.test/onboarding?step=1",
            "Tell us about yourself",
        )
        .with_present(&Locator::css("form input[name='first_name']"))
        .with_present(&Locator::css("input[name='first_name']"))
        .with_present(&phone)]);
        let api = StuckApi {
            step: OnboardingStep::PersonalInfo,
        };
        let markers = MarkerSet::default();
        let timeouts = fast_timeouts();
        let policy = fast_policy();
        let reader = SnapshotReader::new(markers.clone(), timeouts);
        let base = Url::parse("https://x.test").unwrap();

        let outcome = engine(&page, &api, &reader, &markers, &timeouts, &policy, &base)
            .recover(
                &FlowError::Validation("phone is required".into()),
                OnboardingStep::PersonalInfo,
            )
            .await;

        assert_eq!(page.field_value(&phone).as_deref(), Some("5555550123"));
        // Marker is on screen with no error banner, so the correction
        // counts as clearing the error condition.
        assert!(outcome.recovered);
    }

    #[tokio::test]
    async fn navigation_error_reloads_the_page() {
        let page = ScriptedPage::single("https://x.test/onboarding?step=3", "Legal Consent");
        let api = StuckApi {
            step: OnboardingStep::LegalConsent,
        };
        let markers = MarkerSet::default();
        let timeouts = fast_timeouts();
        let policy = fast_policy();
        let reader = SnapshotReader::new(markers.clone(), timeouts);
        let base = Url::parse("https://x.test").unwrap();

        let outcome = engine(&page, &api, &reader, &markers, &timeouts, &policy, &base)
            .recover(
                &FlowError::StalledAfterSubmit {
                    step: OnboardingStep::LegalConsent,
                    timeout_ms: 15_000,
                },
                OnboardingStep::LegalConsent,
            )
            .await;

        assert!(page.reloads() >= 1);
        assert!(outcome.recovered);
    }

    #[tokio::test]
    async fn fallback_navigates_directly_when_nothing_is_clickable() {
        let page = ScriptedPage::single("https://x.test/onboarding?step=2", "blank interstitial");
        let api = StuckApi {
            step: OnboardingStep::Signature,
        };
        let markers = MarkerSet::default();
        let timeouts = fast_timeouts();
        let policy = fast_policy();
        let reader = SnapshotReader::new(markers.clone(), timeouts);
        let base = Url::parse("https://x.test").unwrap();

        let _ = engine(&page, &api, &reader, &markers, &timeouts, &policy, &base)
            .recover(
                &FlowError::Precondition {
                    step: OnboardingStep::Signature,
                    timeout_ms: 10_000,
                },
                OnboardingStep::Signature,
            )
            .await;

        // Precondition failure tags as element-not-found; with no
        // progression control the ladder falls through to direct nav.
        assert!(page
            .clicks()
            .iter()
            .all(|click| !click.contains("Continue")));
    }
}
