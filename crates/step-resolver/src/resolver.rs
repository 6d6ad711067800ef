use pilot_core_types::{
    AuthState, OnboardingStatus, OnboardingStep, PageSnapshot, ResolvedState, RetryPolicy,
};
use page_probe::{PagePort, SnapshotReader};
use status_detect::{detect_auth_state, detect_onboarding_status, ApiPort};
use tracing::{debug, info, warn};

/// Runs detectors and the page reader, then merges their signals.
pub struct StepResolver<'a> {
    pub page: &'a dyn PagePort,
    pub api: &'a dyn ApiPort,
    pub reader: &'a SnapshotReader,
    pub policy: &'a RetryPolicy,
}

impl StepResolver<'_> {
    pub async fn resolve(&self) -> ResolvedState {
        let snapshot = self.reader.read_snapshot(self.page).await;

        let mut auth = detect_auth_state(self.api, Some(&snapshot), self.policy).await;
        if auth.needs_authentication() {
            return resolve_signals(auth, OnboardingStatus::unavailable(), snapshot);
        }

        let mut status = detect_onboarding_status(self.api, self.policy).await;
        if status.auth_required {
            // The status endpoint saw an expired session mid-cycle; the
            // session detector is the authority on what that means.
            debug!("status endpoint returned 401, re-running auth detection");
            auth = detect_auth_state(self.api, Some(&snapshot), self.policy).await;
            if auth.needs_authentication() {
                return resolve_signals(auth, status, snapshot);
            }
            status = detect_onboarding_status(self.api, self.policy).await;
        }

        resolve_signals(auth, status, snapshot)
    }
}

/// The merge algorithm. Rules apply strictly in order; each short-circuits
/// and later rules are fallbacks for when an earlier one has no signal.
pub fn resolve_signals(
    auth: AuthState,
    status: OnboardingStatus,
    snapshot: PageSnapshot,
) -> ResolvedState {
    let mut warnings = Vec::new();
    if let Some(warning) = &auth.warning {
        warnings.push(warning.clone());
    }
    if let Some(error) = &snapshot.error {
        warnings.push(format!("page snapshot degraded: {error}"));
    }

    let current_step = if auth.needs_authentication() {
        OnboardingStep::NotStarted
    } else if auth.onboarding_completed || status.is_complete {
        OnboardingStep::Complete
    } else {
        let visual = snapshot.marker_step();
        match (status.server_step, visual) {
            (Some(server), Some(seen)) if server.distance(seen) > 1 => {
                // The API may be stale; the DOM reflects what the user
                // actually sees now. A discrepancy of exactly 1 is an
                // expected in-flight transition and stays silent.
                warnings.push(format!(
                    "server declares {server} but the page renders {seen}; trusting the page"
                ));
                seen
            }
            (Some(server), _) => server,
            (None, Some(seen)) => seen,
            (None, None) => match status.flags {
                Some(flags) => flags.first_incomplete(),
                None => {
                    warnings.push(
                        "no server, visual, or flag signal; defaulting to personal info"
                            .to_string(),
                    );
                    OnboardingStep::PersonalInfo
                }
            },
        }
    };

    for warning in &warnings {
        warn!("resolution warning: {warning}");
    }
    info!(step = %current_step, "resolved onboarding state");

    ResolvedState {
        current_step,
        is_complete: current_step == OnboardingStep::Complete,
        can_resume_from: current_step,
        auth,
        status,
        snapshot,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core_types::{ApiStatus, StepCompletionFlags};

    fn authed() -> AuthState {
        AuthState {
            is_authenticated: true,
            onboarding_completed: false,
            user: Some(serde_json::json!({})),
            api_status: ApiStatus::Success,
            warning: None,
        }
    }

    fn status_with_step(step: OnboardingStep) -> OnboardingStatus {
        OnboardingStatus {
            flags: None,
            server_step: Some(step),
            is_complete: false,
            api_status: ApiStatus::Success,
            auth_required: false,
        }
    }

    #[test]
    fn completed_auth_wins_over_everything() {
        // P1: server flags and DOM both claim an earlier step.
        let auth = AuthState {
            onboarding_completed: true,
            ..authed()
        };
        let snapshot = PageSnapshot {
            has_signature_content: true,
            ..PageSnapshot::default()
        };
        let resolved = resolve_signals(auth, status_with_step(OnboardingStep::Signature), snapshot);
        assert_eq!(resolved.current_step, OnboardingStep::Complete);
        assert!(resolved.is_complete);
    }

    #[test]
    fn api_wins_on_small_discrepancy() {
        // P2: server says 3, page renders 2, difference of 1.
        let snapshot = PageSnapshot {
            has_signature_content: true,
            ..PageSnapshot::default()
        };
        let resolved = resolve_signals(
            authed(),
            status_with_step(OnboardingStep::LegalConsent),
            snapshot,
        );
        assert_eq!(resolved.current_step, OnboardingStep::LegalConsent);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn visual_overrides_api_on_large_discrepancy() {
        // P3: server says 1, page renders verification content.
        let snapshot = PageSnapshot {
            has_verification_content: true,
            ..PageSnapshot::default()
        };
        let resolved = resolve_signals(
            authed(),
            status_with_step(OnboardingStep::PersonalInfo),
            snapshot,
        );
        assert_eq!(resolved.current_step, OnboardingStep::Verification);
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn flags_fallback_finds_first_incomplete() {
        // P4: no server step, no decisive markers.
        let status = OnboardingStatus {
            flags: Some(StepCompletionFlags {
                personal_info: true,
                signature: true,
                legal_consent: false,
                verification: false,
            }),
            server_step: None,
            is_complete: false,
            api_status: ApiStatus::Success,
            auth_required: false,
        };
        let resolved = resolve_signals(authed(), status, PageSnapshot::default());
        assert_eq!(resolved.current_step, OnboardingStep::LegalConsent);
    }

    #[test]
    fn unauthenticated_resolves_to_not_started() {
        let resolved = resolve_signals(
            AuthState::unauthenticated(),
            OnboardingStatus::unavailable(),
            PageSnapshot::default(),
        );
        assert_eq!(resolved.current_step, OnboardingStep::NotStarted);
        assert!(resolved.needs_authentication());
        assert!(!resolved.is_complete);
    }

    #[test]
    fn no_signal_at_all_defaults_to_step_one_with_warning() {
        let resolved = resolve_signals(
            authed(),
            OnboardingStatus::unavailable(),
            PageSnapshot::default(),
        );
        assert_eq!(resolved.current_step, OnboardingStep::PersonalInfo);
        assert!(resolved
            .warnings
            .iter()
            .any(|warning| warning.contains("defaulting")));
    }

    #[test]
    fn can_resume_from_always_equals_current_step() {
        let snapshot = PageSnapshot {
            has_legal_content: true,
            ..PageSnapshot::default()
        };
        let resolved = resolve_signals(authed(), OnboardingStatus::unavailable(), snapshot);
        assert_eq!(resolved.can_resume_from, resolved.current_step);
    }

    #[test]
    fn server_complete_flag_resolves_complete_without_server_step() {
        let status = OnboardingStatus {
            flags: None,
            server_step: None,
            is_complete: true,
            api_status: ApiStatus::Success,
            auth_required: false,
        };
        let resolved = resolve_signals(authed(), status, PageSnapshot::default());
        assert!(resolved.is_complete);
    }
}
