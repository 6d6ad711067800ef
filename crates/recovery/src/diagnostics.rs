//! Failure diagnostics for human debugging.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use page_probe::{PagePort, SnapshotReader};
use pilot_core_types::{classify_error_text, DiagnosticsRecord, ErrorTag, OnboardingStep};
use tracing::warn;

/// Capture everything a human needs to understand a step failure: tags,
/// the current snapshot, a structural DOM summary, and a screenshot when
/// an artifact directory is configured.
pub async fn capture_diagnostics(
    page: &dyn PagePort,
    reader: &SnapshotReader,
    step: OnboardingStep,
    typed_tag: ErrorTag,
    error_message: &str,
    artifact_dir: Option<&Path>,
) -> DiagnosticsRecord {
    let mut tags: BTreeSet<ErrorTag> = classify_error_text(error_message);
    tags.remove(&ErrorTag::Unknown);
    tags.insert(typed_tag);

    let snapshot = reader.read_snapshot(page).await;
    let dom_analysis = serde_json::json!({
        "pathname": snapshot.pathname,
        "stepTitle": snapshot.step_title,
        "markerStep": snapshot.marker_step().map(|s| s.as_index()),
        "hasErrors": snapshot.has_errors,
        "errorMessages": snapshot.error_messages,
        "hasSpinner": snapshot.has_spinner,
        "hasContinueButton": snapshot.has_continue_button,
    });

    let screenshot_ref = match artifact_dir {
        Some(dir) => save_screenshot(page, step, dir).await,
        None => None,
    };

    let record = DiagnosticsRecord {
        timestamp: Utc::now(),
        step,
        error_message: error_message.to_string(),
        tags,
        snapshot,
        dom_analysis,
        screenshot_ref,
    };
    if let Some(dir) = artifact_dir {
        persist_record(&record, dir).await;
    }
    record
}

async fn persist_record(record: &DiagnosticsRecord, dir: &Path) {
    let name = format!(
        "failure-step{}-{}.json",
        record.step.as_index(),
        record.timestamp.format("%Y%m%dT%H%M%S%.3f")
    );
    let bytes = match serde_json::to_vec_pretty(record) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("diagnostics serialization failed: {err}");
            return;
        }
    };
    if let Err(err) = tokio::fs::create_dir_all(dir).await {
        warn!("cannot create artifact dir: {err}");
        return;
    }
    if let Err(err) = tokio::fs::write(dir.join(name), bytes).await {
        warn!("cannot write diagnostics record: {err}");
    }
}

async fn save_screenshot(page: &dyn PagePort, step: OnboardingStep, dir: &Path) -> Option<String> {
    let bytes = match page.screenshot().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("screenshot capture failed: {err}");
            return None;
        }
    };
    let name = format!(
        "failure-step{}-{}.png",
        step.as_index(),
        Utc::now().format("%Y%m%dT%H%M%S%.3f")
    );
    let path = dir.join(name);
    if let Err(err) = tokio::fs::create_dir_all(dir).await {
        warn!("cannot create artifact dir: {err}");
        return None;
    }
    match tokio::fs::write(&path, bytes).await {
        Ok(()) => Some(path.display().to_string()),
        Err(err) => {
            warn!("cannot write screenshot: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_probe::fake::ScriptedPage;
    use page_probe::MarkerSet;
    use pilot_core_types::Timeouts;

    fn reader() -> SnapshotReader {
        SnapshotReader::new(
            MarkerSet::default(),
            Timeouts {
                settle_ms: 0,
                ..Timeouts::default()
            },
        )
    }

    #[tokio::test]
    async fn merges_typed_tag_with_text_classification() {
        let page = ScriptedPage::single("https://x.test/onboarding?step=2", "Signature");
        let record = capture_diagnostics(
            &page,
            &reader(),
            OnboardingStep::Signature,
            ErrorTag::ElementNotFound,
            "click timed out while locating the control",
            None,
        )
        .await;
        assert!(record.tags.contains(&ErrorTag::ElementNotFound));
        assert!(record.tags.contains(&ErrorTag::Timeout));
        assert!(record.screenshot_ref.is_none());
        assert!(record.snapshot.has_signature_content);
    }

    #[tokio::test]
    async fn writes_screenshot_into_artifact_dir() {
        let dir = tempfile::tempdir().unwrap();
        let page = ScriptedPage::single("https://x.test/onboarding?step=1", "Continue");
        let record = capture_diagnostics(
            &page,
            &reader(),
            OnboardingStep::PersonalInfo,
            ErrorTag::Timeout,
            "timed out",
            Some(dir.path()),
        )
        .await;
        let path = record.screenshot_ref.expect("screenshot path");
        assert!(std::path::Path::new(&path).exists());
        let json_written = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .any(|entry| entry.path().extension().is_some_and(|ext| ext == "json"));
        assert!(json_written);
    }
}
