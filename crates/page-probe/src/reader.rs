use pilot_core_types::{OnboardingStep, PageSnapshot, Timeouts};
use tracing::{debug, warn};

use crate::markers::MarkerSet;
use crate::ports::{Locator, PagePort};

/// Reads a fresh `PageSnapshot` from the live page.
///
/// This primitive must stay usable inside recovery paths, so it never
/// propagates an error: an internal failure comes back as a snapshot with
/// the `error` field set. Calling it twice without an intervening UI
/// mutation yields an equal snapshot.
pub struct SnapshotReader {
    markers: MarkerSet,
    timeouts: Timeouts,
}

impl SnapshotReader {
    pub fn new(markers: MarkerSet, timeouts: Timeouts) -> Self {
        Self { markers, timeouts }
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub async fn read_snapshot(&self, page: &dyn PagePort) -> PageSnapshot {
        page.settle(self.timeouts.settle()).await;
        match self.read_inner(page).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("snapshot read failed: {err}");
                PageSnapshot {
                    error: Some(err.to_string()),
                    ..PageSnapshot::default()
                }
            }
        }
    }

    async fn read_inner(&self, page: &dyn PagePort) -> Result<PageSnapshot, crate::ProbeError> {
        let url = page.current_url().await?;
        let pathname = pathname_of(&url);
        let body = page.body_text().await?;

        let has_personal_form = page
            .exists(&Locator::css(self.markers.personal_form_selector.clone()))
            .await
            .unwrap_or(false);

        let step_title = ["Signature", "Legal", "Identity Verification"]
            .iter()
            .find(|title| body.contains(**title))
            .map(|title| (*title).to_string())
            .or_else(|| has_personal_form.then(|| "Personal Information".to_string()));

        let error_locator = Locator::css(self.markers.error_selector.clone());
        let has_errors = page.exists(&error_locator).await.unwrap_or(false);
        let error_messages = if has_errors {
            page.text_of(&error_locator)
                .await
                .ok()
                .flatten()
                .map(|text| {
                    text.lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let snapshot = PageSnapshot {
            pathname,
            step_title,
            has_personal_form,
            has_signature_content: self.markers.step_in_text(OnboardingStep::Signature, &body),
            has_legal_content: self.markers.step_in_text(OnboardingStep::LegalConsent, &body),
            has_verification_content: self
                .markers
                .step_in_text(OnboardingStep::Verification, &body),
            has_dashboard_marker: self.markers.step_in_text(OnboardingStep::Complete, &body),
            has_errors,
            error_messages,
            has_spinner: page
                .exists(&Locator::css(self.markers.spinner_selector.clone()))
                .await
                .unwrap_or(false),
            has_continue_button: page
                .exists(&Locator::text(self.markers.continue_label.clone()))
                .await
                .unwrap_or(false),
            has_complete_button: page
                .exists(&Locator::text(self.markers.complete_label.clone()))
                .await
                .unwrap_or(false),
            error: None,
        };

        debug!(
            pathname = %snapshot.pathname,
            marker_step = ?snapshot.marker_step(),
            has_errors = snapshot.has_errors,
            "page snapshot"
        );
        Ok(snapshot)
    }
}

fn pathname_of(url: &str) -> String {
    url.split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .split_once('/')
        .map(|(_, path)| format!("/{path}"))
        .unwrap_or_else(|| "/".to_string())
        .split(['?', '#'])
        .next()
        .unwrap_or("/")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::ScriptedPage;

    fn reader() -> SnapshotReader {
        let timeouts = Timeouts {
            settle_ms: 0,
            ..Timeouts::default()
        };
        SnapshotReader::new(MarkerSet::default(), timeouts)
    }

    #[tokio::test]
    async fn snapshot_reads_legal_step() {
        let page = ScriptedPage::single(
            "https://app.example.test/onboarding?step=3",
            "Step 3 of 4\nLegal Consent agreements\nContinue",
        );
        let snapshot = reader().read_snapshot(&page).await;
        assert_eq!(snapshot.pathname, "/onboarding");
        assert!(snapshot.has_legal_content);
        assert!(!snapshot.has_verification_content);
        assert!(snapshot.has_continue_button);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn snapshot_is_idempotent_without_mutation() {
        let page = ScriptedPage::single(
            "https://app.example.test/onboarding?step=2",
            "Signature\nSign your name below",
        );
        let first = reader().read_snapshot(&page).await;
        let second = reader().read_snapshot(&page).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn snapshot_survives_probe_failure() {
        let page = ScriptedPage::failing("browser session lost");
        let snapshot = reader().read_snapshot(&page).await;
        assert!(snapshot.error.is_some());
        assert_eq!(snapshot.marker_step(), None);
    }

    #[test]
    fn pathname_extraction() {
        assert_eq!(pathname_of("https://x.test/onboarding?step=1"), "/onboarding");
        assert_eq!(pathname_of("https://x.test/"), "/");
        assert_eq!(pathname_of("https://x.test"), "/");
    }
}
