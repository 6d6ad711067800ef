//! Structured automation surface over [`Harness`].
//!
//! Every operation here returns a [`SurfaceResult`] instead of erroring:
//! failures come back as `success: false` with the original message and,
//! when one was captured, an artifact path. Callers embedding the harness
//! in test workers never have to catch anything across this boundary.

use page_probe::PagePort;
use pilot_core_types::{PageSnapshot, PersonalInfo};
use serde::Serialize;
use serde_json::json;
use step_flow::RunInput;
use tracing::instrument;

use crate::harness::Harness;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
}

impl SurfaceResult {
    fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            artifact_ref: None,
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            artifact_ref: None,
        }
    }
}

/// Borrowing facade; obtained via [`Harness::surface`].
pub struct Surface<'a> {
    harness: &'a Harness,
}

impl Harness {
    pub fn surface(&self) -> Surface<'_> {
        Surface { harness: self }
    }
}

impl Surface<'_> {
    /// Navigates to a path under the configured base URL.
    #[instrument(skip(self))]
    pub async fn navigate(&self, path: &str) -> SurfaceResult {
        let harness = self.harness;
        let url = match harness.base_url.join(path) {
            Ok(url) => url,
            Err(err) => return SurfaceResult::failed(err),
        };
        if let Err(err) = harness.page.navigate(url.as_str()).await {
            return SurfaceResult::failed(err);
        }
        harness.page.settle(harness.config.timeouts.settle()).await;
        let snapshot = harness.snapshot().await;
        SurfaceResult::ok(json!({
            "url": url.as_str(),
            "pathname": snapshot.pathname,
        }))
    }

    #[instrument(skip_all)]
    pub async fn authenticate(&self, email: &str, password: &str) -> SurfaceResult {
        match self.harness.authenticate_with(email, password).await {
            Ok(()) => SurfaceResult::ok(json!({ "authenticated": true })),
            Err(err) => SurfaceResult::failed(err),
        }
    }

    /// Runs the wizard end to end. Explicit arguments override the
    /// configured defaults.
    #[instrument(skip_all)]
    pub async fn complete_onboarding(
        &self,
        personal: Option<PersonalInfo>,
        skip_verification: Option<bool>,
    ) -> SurfaceResult {
        let config = &self.harness.config;
        let input = RunInput {
            personal: personal.unwrap_or_else(|| config.personal.clone()),
            skip_verification: skip_verification.unwrap_or(config.skip_verification),
        };
        let report = self.harness.run_onboarding_with(&input).await;
        report_result(&report)
    }

    #[instrument(skip_all)]
    pub async fn authenticate_and_onboard(
        &self,
        email: &str,
        password: &str,
        personal: Option<PersonalInfo>,
        skip_verification: Option<bool>,
    ) -> SurfaceResult {
        let first = self.complete_onboarding(personal.clone(), skip_verification).await;
        let needs_auth = first
            .data
            .as_ref()
            .and_then(|data| data.get("needs_authentication"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if !needs_auth {
            return first;
        }
        let auth = self.authenticate(email, password).await;
        if !auth.success {
            return auth;
        }
        self.complete_onboarding(personal, skip_verification).await
    }

    /// Marker-derived inventory of what the current page renders.
    pub async fn get_components(&self) -> SurfaceResult {
        let snapshot = self.harness.snapshot().await;
        if let Some(err) = &snapshot.error {
            return SurfaceResult::failed(err);
        }
        SurfaceResult::ok(json!({
            "pathname": snapshot.pathname,
            "stepTitle": snapshot.step_title,
            "components": component_inventory(&snapshot),
        }))
    }

    /// Writes a screenshot under the artifact directory (or the working
    /// directory when none is configured) and reports its path.
    pub async fn screenshot(&self, filename: &str) -> SurfaceResult {
        let harness = self.harness;
        let dir = harness
            .config
            .artifact_dir
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let path = dir.join(filename);
        match harness.screenshot(&path).await {
            Ok(()) => {
                let shown = path.display().to_string();
                SurfaceResult {
                    artifact_ref: Some(shown.clone()),
                    ..SurfaceResult::ok(json!({ "path": shown }))
                }
            }
            Err(err) => SurfaceResult::failed(err),
        }
    }
}

fn report_result(report: &pilot_core_types::RunReport) -> SurfaceResult {
    SurfaceResult {
        success: report.success,
        data: serde_json::to_value(report).ok(),
        error: (!report.success).then(|| {
            if report.needs_authentication {
                "onboarding requires authentication".to_string()
            } else {
                "onboarding run did not complete successfully".to_string()
            }
        }),
        artifact_ref: None,
    }
}

fn component_inventory(snapshot: &PageSnapshot) -> Vec<&'static str> {
    let mut components = Vec::new();
    let mut push = |present: bool, name: &'static str| {
        if present {
            components.push(name);
        }
    };
    push(snapshot.has_personal_form, "personal-info-form");
    push(snapshot.has_signature_content, "signature-step");
    push(snapshot.has_legal_content, "legal-consent-step");
    push(snapshot.has_verification_content, "verification-step");
    push(snapshot.has_dashboard_marker, "dashboard");
    push(snapshot.has_continue_button, "continue-button");
    push(snapshot.has_complete_button, "complete-button");
    push(snapshot.has_spinner, "spinner");
    push(snapshot.has_errors, "error-banner");
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_lists_only_rendered_components() {
        let snapshot = PageSnapshot {
            has_legal_content: true,
            has_continue_button: true,
            has_errors: true,
            ..PageSnapshot::default()
        };
        assert_eq!(
            component_inventory(&snapshot),
            vec!["legal-consent-step", "continue-button", "error-banner"]
        );
    }

    #[test]
    fn failures_serialize_without_empty_fields() {
        let result = SurfaceResult::failed("element not found: button");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "element not found: button");
        assert!(value.get("data").is_none());
        assert!(value.get("artifactRef").is_none());
    }

    #[test]
    fn report_result_carries_auth_signal() {
        let mut report = pilot_core_types::RunReport::begin(pilot_core_types::RunId::new());
        report.needs_authentication = true;
        let result = report_result(&report);
        assert!(!result.success);
        assert_eq!(
            result.data.unwrap()["needs_authentication"],
            serde_json::Value::Bool(true)
        );
    }
}
