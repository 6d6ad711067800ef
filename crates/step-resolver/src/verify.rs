use pilot_core_types::{OnboardingStep, RetryPolicy};
use page_probe::{PagePort, SnapshotReader};
use status_detect::{detect_onboarding_status, ApiPort};
use tracing::debug;

/// Decides whether a step actually completed, using independent signals:
/// the next step's marker rendered on the page, or the server's per-step
/// flag. Never "the click didn't throw".
pub struct CompletionVerifier<'a> {
    pub page: &'a dyn PagePort,
    pub api: &'a dyn ApiPort,
    pub reader: &'a SnapshotReader,
    pub policy: &'a RetryPolicy,
}

impl CompletionVerifier<'_> {
    pub async fn verify_step_complete(&self, step: OnboardingStep) -> bool {
        let snapshot = self.reader.read_snapshot(self.page).await;

        if let Some(seen) = snapshot.marker_step() {
            if seen > step {
                debug!(%step, now_rendered = %seen, "visual confirmation of progression");
                return true;
            }
        }
        if snapshot.has_dashboard_marker {
            debug!(%step, "dashboard rendered, wizard is past this step");
            return true;
        }

        let status = detect_onboarding_status(self.api, self.policy).await;
        if let Some(flags) = status.flags {
            if flags.is_complete(step) {
                debug!(%step, "server flag confirms completion");
                return true;
            }
        }
        if status
            .server_step
            .map(|server| server > step)
            .unwrap_or(false)
            || status.is_complete
        {
            return true;
        }

        debug!(%step, "no independent signal confirms completion");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pilot_core_types::{StepCompletionFlags, Timeouts};
    use page_probe::fake::ScriptedPage;
    use page_probe::MarkerSet;
    use status_detect::{DetectError, SessionReply, StatusReply};

    struct FixedApi {
        reply: StatusReply,
    }

    #[async_trait]
    impl ApiPort for FixedApi {
        async fn fetch_session(&self) -> Result<SessionReply, DetectError> {
            Ok(SessionReply { user: None })
        }

        async fn fetch_status(&self) -> Result<StatusReply, DetectError> {
            Ok(self.reply.clone())
        }
    }

    fn reader() -> SnapshotReader {
        SnapshotReader::new(
            MarkerSet::default(),
            Timeouts {
                settle_ms: 0,
                ..Timeouts::default()
            },
        )
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 1,
            attempt_timeout_ms: 50,
            backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn next_step_marker_confirms_completion() {
        // Scenario C: after step 1, the signature heading is enough.
        let page = ScriptedPage::single("https://x.test/onboarding?step=2", "Signature");
        let api = FixedApi {
            reply: StatusReply::Status {
                server_step: None,
                is_complete: false,
                flags: StepCompletionFlags::default(),
            },
        };
        let reader = reader();
        let policy = fast_policy();
        let verifier = CompletionVerifier {
            page: &page,
            api: &api,
            reader: &reader,
            policy: &policy,
        };
        assert!(
            verifier
                .verify_step_complete(OnboardingStep::PersonalInfo)
                .await
        );
    }

    #[tokio::test]
    async fn server_flag_confirms_completion_without_marker() {
        let page = ScriptedPage::single("https://x.test/onboarding?step=1", "");
        let api = FixedApi {
            reply: StatusReply::Status {
                server_step: None,
                is_complete: false,
                flags: StepCompletionFlags {
                    personal_info: true,
                    ..StepCompletionFlags::default()
                },
            },
        };
        let reader = reader();
        let policy = fast_policy();
        let verifier = CompletionVerifier {
            page: &page,
            api: &api,
            reader: &reader,
            policy: &policy,
        };
        assert!(
            verifier
                .verify_step_complete(OnboardingStep::PersonalInfo)
                .await
        );
    }

    #[tokio::test]
    async fn no_signal_means_unverified() {
        let page = ScriptedPage::single("https://x.test/onboarding?step=1", "Personal details");
        let api = FixedApi {
            reply: StatusReply::Status {
                server_step: Some(OnboardingStep::PersonalInfo),
                is_complete: false,
                flags: StepCompletionFlags::default(),
            },
        };
        let reader = reader();
        let policy = fast_policy();
        let verifier = CompletionVerifier {
            page: &page,
            api: &api,
            reader: &reader,
            policy: &policy,
        };
        assert!(
            !verifier
                .verify_step_complete(OnboardingStep::PersonalInfo)
                .await
        );
    }
}
