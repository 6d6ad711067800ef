//! The run loop: resolve where the wizard stands, skip what is already
//! done, drive the remaining steps in order, verify every advance
//! independently, and hand failures to the recovery engine exactly once
//! per step.

use std::path::Path;

use page_probe::{MarkerSet, PagePort, SnapshotReader};
use pilot_core_types::{
    OnboardingStep, ResolvedState, RetryPolicy, RunId, RunReport, StepResult, StepStatus, Timeouts,
};
use pilot_recovery::RecoveryEngine;
use status_detect::ApiPort;
use step_flow::{executors_for, FlowError, RunInput, StepDeps, StepExecutor};
use step_resolver::{CompletionVerifier, StepResolver};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub struct Orchestrator<'a> {
    pub page: &'a dyn PagePort,
    pub api: &'a dyn ApiPort,
    pub reader: &'a SnapshotReader,
    pub markers: &'a MarkerSet,
    pub timeouts: &'a Timeouts,
    pub policy: &'a RetryPolicy,
    pub base_url: &'a Url,
    pub artifact_dir: Option<&'a Path>,
}

impl Orchestrator<'_> {
    #[instrument(skip_all, fields(run_id))]
    pub async fn run(&self, input: &RunInput) -> RunReport {
        let run_id = RunId::new();
        tracing::Span::current().record("run_id", run_id.to_string());
        let mut report = RunReport::begin(run_id);

        let mut state = self.resolve().await;
        report.warnings.extend(state.warnings.iter().cloned());
        info!(step = %state.current_step, complete = state.is_complete, "initial resolution");

        if state.needs_authentication() {
            // Reported, never worked around; credentials are the caller's
            // problem.
            info!("no authenticated session, stopping before the wizard");
            report.needs_authentication = true;
            report.final_state = Some(state);
            return report.finish();
        }

        if state.is_complete {
            info!("onboarding already complete");
            report.already_complete = true;
            if !state.snapshot.has_dashboard_marker {
                self.show_dashboard().await;
                state = self.resolve().await;
            }
            report.success = state.is_complete && state.snapshot.has_dashboard_marker;
            if !report.success {
                warn!("complete per the server but the dashboard never rendered");
            }
            report.final_state = Some(state);
            return report.finish();
        }

        self.goto_resume_point(&state).await;

        let deps = StepDeps {
            page: self.page,
            markers: self.markers,
            timeouts: self.timeouts,
        };
        let mut aborted = false;

        for executor in executors_for(input) {
            let step = executor.step();
            if state.is_complete || step < state.current_step {
                debug!(%step, "already behind us, skipping");
                report.steps.push(StepResult::skipped(step));
                continue;
            }
            if let Some(flags) = state.status.flags {
                if flags.is_complete(step) {
                    debug!(%step, "server flag already set, skipping");
                    report.steps.push(StepResult::skipped(step));
                    continue;
                }
            }

            let result = self
                .drive_step(executor.as_ref(), &deps, step, &mut state)
                .await;
            let acceptable = result.is_acceptable();
            report.steps.push(result);
            if !acceptable {
                warn!(%step, "step did not verifiably complete, stopping the run");
                aborted = true;
                break;
            }

            state = self.resolve().await;
        }

        if state.is_complete && !state.snapshot.has_dashboard_marker {
            self.show_dashboard().await;
            state = self.resolve().await;
        }

        let fresh: Vec<String> = state
            .warnings
            .iter()
            .filter(|warning| !report.warnings.contains(warning))
            .cloned()
            .collect();
        report.warnings.extend(fresh);
        report.success = !aborted
            && report.steps.iter().all(StepResult::is_acceptable)
            && state.is_complete
            && state.snapshot.has_dashboard_marker;
        report.final_state = Some(state);
        report.finish()
    }

    /// One step, end to end: execute, verify, and on failure run recovery
    /// once. A recovery that clears the page without advancing it earns a
    /// single re-execution; anything after that is a hard stop.
    async fn drive_step(
        &self,
        executor: &dyn StepExecutor,
        deps: &StepDeps<'_>,
        step: OnboardingStep,
        state: &mut ResolvedState,
    ) -> StepResult {
        let verifier = CompletionVerifier {
            page: self.page,
            api: self.api,
            reader: self.reader,
            policy: self.policy,
        };
        let started = Instant::now();

        let (status, verified, error) = match executor.execute(deps).await {
            Ok(()) => {
                if verifier.verify_step_complete(step).await {
                    (StepStatus::Completed, true, None)
                } else {
                    warn!(%step, "executor finished but nothing confirms progression");
                    (StepStatus::Uncertain, false, None)
                }
            }
            Err(err) => self.recover_step(executor, deps, &verifier, step, err, state).await,
        };

        StepResult {
            step,
            status,
            verified,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn recover_step(
        &self,
        executor: &dyn StepExecutor,
        deps: &StepDeps<'_>,
        verifier: &CompletionVerifier<'_>,
        step: OnboardingStep,
        error: FlowError,
        state: &mut ResolvedState,
    ) -> (StepStatus, bool, Option<String>) {
        warn!(%step, %error, "step failed, invoking recovery");
        let engine = RecoveryEngine {
            page: self.page,
            api: self.api,
            reader: self.reader,
            markers: self.markers,
            timeouts: self.timeouts,
            policy: self.policy,
            base_url: self.base_url,
            artifact_dir: self.artifact_dir,
        };
        let outcome = engine.recover(&error, step).await;
        let message = Some(error.to_string());
        if !outcome.recovered {
            *state = outcome.state;
            return (StepStatus::Failed, false, message);
        }

        *state = outcome.state;
        if state.is_complete || state.current_step > step {
            return (StepStatus::Recovered, true, message);
        }

        // The error cleared but the wizard is still on this step; run the
        // executor once more against the corrected page.
        debug!(%step, "recovery cleared the error, re-running the step once");
        match executor.execute(deps).await {
            Ok(()) if verifier.verify_step_complete(step).await => {
                (StepStatus::Recovered, true, message)
            }
            Ok(()) => (StepStatus::Failed, false, message),
            Err(retry_err) => (StepStatus::Failed, false, Some(retry_err.to_string())),
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

    /// Navigate to the wizard at the resolved resume point, unless it is
    /// already rendering.
    async fn goto_resume_point(&self, state: &ResolvedState) {
        if state.snapshot.pathname.starts_with("/onboarding")
            && state.snapshot.marker_step() == Some(state.can_resume_from)
        {
            return;
        }
        let Ok(mut target) = self.base_url.join("/onboarding") else {
            return;
        };
        target.set_query(Some(&format!("step={}", state.can_resume_from.as_index())));
        info!(%target, "navigating to resume point");
        if let Err(err) = self.page.navigate(target.as_str()).await {
            warn!("navigation to resume point failed: {err}");
        }
        self.page.settle(self.timeouts.settle()).await;
    }

    async fn show_dashboard(&self) {
        let Ok(target) = self.base_url.join("/dashboard") else {
            return;
        };
        if let Err(err) = self.page.navigate(target.as_str()).await {
            warn!("dashboard navigation failed: {err}");
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
    use pilot_core_types::{PersonalInfo, StepCompletionFlags};
    use status_detect::{DetectError, SessionReply, StatusReply};

    struct FixedApi {
        session_user: Option<serde_json::Value>,
        status: StatusReply,
    }

    impl FixedApi {
        fn authenticated(status: StatusReply) -> Self {
            Self {
                session_user: Some(serde_json::json!({ "onboarding_completed": false })),
                status,
            }
        }
    }

    #[async_trait]
    impl ApiPort for FixedApi {
        async fn fetch_session(&self) -> Result<SessionReply, DetectError> {
            Ok(SessionReply {
                user: self.session_user.clone(),
            })
        }

        async fn fetch_status(&self) -> Result<StatusReply, DetectError> {
            Ok(self.status.clone())
        }
    }

    /// Backend whose status flips to complete once the page reaches the
    /// given scene, the way the real server records completion when the
    /// final submission lands.
    struct SceneApi<'a> {
        page: &'a ScriptedPage,
        base: StatusReply,
        complete_from_scene: usize,
    }

    #[async_trait]
    impl ApiPort for SceneApi<'_> {
        async fn fetch_session(&self) -> Result<SessionReply, DetectError> {
            let completed = self.page.scene_index() >= self.complete_from_scene;
            Ok(SessionReply {
                user: Some(serde_json::json!({ "onboarding_completed": completed })),
            })
        }

        async fn fetch_status(&self) -> Result<StatusReply, DetectError> {
            if self.page.scene_index() >= self.complete_from_scene {
                return Ok(StatusReply::Status {
                    server_step: Some(OnboardingStep::Complete),
                    is_complete: true,
                    flags: StepCompletionFlags {
                        personal_info: true,
                        signature: true,
                        legal_consent: true,
                        verification: true,
                    },
                });
            }
            Ok(self.base.clone())
        }
    }

    fn fast_timeouts() -> Timeouts {
        Timeouts {
            settle_ms: 0,
            precondition_ms: 80,
            postcondition_ms: 80,
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

    fn jane_input() -> RunInput {
        RunInput {
            personal: PersonalInfo {
                first_name: "Jane".into(),
                last_name: "Smith".into(),
                ..PersonalInfo::default()
            },
            skip_verification: false,
        }
    }

    struct Fixture {
        markers: MarkerSet,
        timeouts: Timeouts,
        policy: RetryPolicy,
        reader: SnapshotReader,
        base: Url,
    }

    impl Fixture {
        fn new() -> Self {
            let markers = MarkerSet::default();
            let timeouts = fast_timeouts();
            Self {
                reader: SnapshotReader::new(markers.clone(), timeouts),
                markers,
                timeouts,
                policy: fast_policy(),
                base: Url::parse("https://x.test").unwrap(),
            }
        }

        fn orchestrator<'a>(
            &'a self,
            page: &'a ScriptedPage,
            api: &'a dyn ApiPort,
        ) -> Orchestrator<'a> {
            Orchestrator {
                page,
                api,
                reader: &self.reader,
                markers: &self.markers,
                timeouts: &self.timeouts,
                policy: &self.policy,
                base_url: &self.base,
                artifact_dir: None,
            }
        }
    }

    fn wizard_scenes() -> Vec<Scene> {
        vec![
            Scene::new(
                "https://x.test/onboarding?step=1",
                "Tell us about yourself\nContinue",
            )
            .with_present(&Locator::css("form input[name='first_name']"))
            .with_present(&Locator::css("input[name='first_name']"))
            .with_present(&Locator::css("input[name='last_name']"))
            .advance_on("text:Continue"),
            Scene::new("https://x.test/onboarding?step=2", "Signature\nContinue")
                .with_present(&Locator::css("input[name='signature']"))
                .advance_on("text:Continue"),
            Scene::new("https://x.test/onboarding?step=3", "Legal\nContinue")
                .with_present(&Locator::css("input[name='terms']"))
                .advance_on("text:Continue"),
            Scene::new(
                "https://x.test/onboarding?step=4",
                "Identity Verification\nStart Verification",
            )
            .advance_on("text:Start Verification"),
            Scene::new("https://x.test/dashboard", "Your Estate Plan"),
        ]
    }

    #[tokio::test]
    async fn unauthenticated_run_reports_and_stops() {
        let page = ScriptedPage::single("https://x.test/login", "Sign in");
        let api = FixedApi {
            session_user: None,
            status: StatusReply::AuthenticationRequired,
        };
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(report.needs_authentication);
        assert!(!report.success);
        assert!(report.steps.is_empty());
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn already_complete_run_short_circuits() {
        let page = ScriptedPage::new(vec![
            Scene::new("https://x.test/onboarding", "stale wizard shell"),
            Scene::new("https://x.test/dashboard", "Your Estate Plan"),
        ])
        .with_nav_target("https://x.test/dashboard", 1);
        let api = FixedApi {
            session_user: Some(serde_json::json!({ "onboarding_completed": true })),
            status: StatusReply::Status {
                server_step: None,
                is_complete: true,
                flags: StepCompletionFlags::default(),
            },
        };
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(report.already_complete);
        assert!(report.success);
        assert!(report.steps.is_empty());
        let state = report.final_state.unwrap();
        assert!(state.snapshot.has_dashboard_marker);
    }

    #[tokio::test]
    async fn full_run_drives_every_step_in_order() {
        let page = ScriptedPage::new(wizard_scenes());
        let api = SceneApi {
            page: &page,
            base: StatusReply::Status {
                server_step: None,
                is_complete: false,
                flags: StepCompletionFlags::default(),
            },
            complete_from_scene: 4,
        };
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(report.success, "warnings: {:?}", report.warnings);
        assert_eq!(report.steps.len(), 4);
        assert!(report.steps.iter().all(|step| step.verified));
        assert_eq!(
            report.steps.iter().map(|s| s.step).collect::<Vec<_>>(),
            OnboardingStep::wizard_steps().to_vec()
        );
        assert_eq!(page.scene_index(), 4);
    }

    #[tokio::test]
    async fn resumes_past_steps_the_server_marked_complete() {
        // Resume at step 3: earlier steps are skipped, never re-driven.
        let scenes = wizard_scenes()[2..].to_vec();
        let page = ScriptedPage::new(scenes);
        let api = SceneApi {
            page: &page,
            base: StatusReply::Status {
                server_step: Some(OnboardingStep::LegalConsent),
                is_complete: false,
                flags: StepCompletionFlags {
                    personal_info: true,
                    signature: true,
                    ..StepCompletionFlags::default()
                },
            },
            complete_from_scene: 2,
        };
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(report.success, "warnings: {:?}", report.warnings);
        assert_eq!(report.steps[0].status, StepStatus::Skipped);
        assert_eq!(report.steps[1].status, StepStatus::Skipped);
        assert!(report.steps[2..].iter().all(StepResult::is_acceptable));
        assert!(!page
            .clicks()
            .iter()
            .any(|click| click.contains("first_name")));
    }

    #[tokio::test]
    async fn failed_step_stops_the_run_after_one_recovery() {
        // The wizard never renders, so the first step fails its
        // precondition and recovery finds nothing to fix.
        let page = ScriptedPage::single("https://x.test/onboarding?step=1", "broken shell");
        let api = FixedApi::authenticated(StatusReply::Status {
            server_step: Some(OnboardingStep::PersonalInfo),
            is_complete: false,
            flags: StepCompletionFlags::default(),
        });
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(!report.success);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].status, StepStatus::Failed);
        assert!(!report.steps[0].verified);
        assert!(report.steps[0].error.is_some());
    }

    #[tokio::test]
    async fn dashboard_text_alone_is_not_success() {
        // Every step verifies, the last scene even renders the dashboard
        // heading, but the server never records completion; the run must
        // not claim success on looks alone.
        let page = ScriptedPage::new(vec![
            Scene::new(
                "https://x.test/onboarding?step=4",
                "Identity Verification\nStart Verification",
            )
            .advance_on("text:Start Verification"),
            Scene::new("https://x.test/onboarding?step=4", "Your Estate Plan"),
        ]);
        let api = FixedApi::authenticated(StatusReply::Status {
            server_step: Some(OnboardingStep::Verification),
            is_complete: false,
            flags: StepCompletionFlags {
                personal_info: true,
                signature: true,
                legal_consent: true,
                verification: false,
            },
        });
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(!report.success);
        let state = report.final_state.unwrap();
        assert!(!state.is_complete);
        assert!(state.snapshot.has_dashboard_marker);
    }

    #[tokio::test]
    async fn already_complete_without_dashboard_is_not_success() {
        // Complete per the API, but the dashboard never renders even after
        // navigating to it.
        let page = ScriptedPage::single("https://x.test/onboarding", "blank shell");
        let api = FixedApi {
            session_user: Some(serde_json::json!({ "onboarding_completed": true })),
            status: StatusReply::Status {
                server_step: None,
                is_complete: true,
                flags: StepCompletionFlags::default(),
            },
        };
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(report.already_complete);
        assert!(!report.success);
        assert!(report.steps.is_empty());
        let state = report.final_state.unwrap();
        assert!(!state.snapshot.has_dashboard_marker);
    }

    #[tokio::test]
    async fn unverified_completion_is_not_success() {
        // The verification provider claims it finished, but neither the
        // dashboard nor any server signal confirms it; the run must not
        // report blind success.
        let page = ScriptedPage::new(vec![
            Scene::new(
                "https://x.test/onboarding?step=4",
                "Identity Verification\nStart Verification",
            )
            .advance_on("text:Start Verification"),
            Scene::new("https://x.test/onboarding?step=4", "Verification complete"),
        ]);
        let api = FixedApi::authenticated(StatusReply::Status {
            server_step: Some(OnboardingStep::Verification),
            is_complete: false,
            flags: StepCompletionFlags {
                personal_info: true,
                signature: true,
                legal_consent: true,
                verification: false,
            },
        });
        let fixture = Fixture::new();

        let report = fixture.orchestrator(&page, &api).run(&jane_input()).await;

        assert!(!report.success);
        let last = report.steps.last().unwrap();
        assert_eq!(last.step, OnboardingStep::Verification);
        assert_eq!(last.status, StepStatus::Uncertain);
        assert!(!last.verified);
    }
}
