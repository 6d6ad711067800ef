//! Composition root: owns the browser, wires the ports together, and
//! exposes the operations the CLI drives.

use std::path::Path;

use cdp_page::CdpPage;
use page_probe::{Locator, MarkerSet, PagePort, SnapshotReader};
use pilot_core_types::{PageSnapshot, ResolvedState, RunReport};
use status_detect::ApiPort;
use step_flow::{poll_until, RunInput};
use step_resolver::StepResolver;
use tracing::{info, instrument, warn};
use url::Url;

use crate::api_bridge::InPageApi;
use crate::config::HarnessConfig;
use crate::errors::HarnessError;
use crate::orchestrator::Orchestrator;

pub struct Harness {
    pub(crate) config: HarnessConfig,
    pub(crate) base_url: Url,
    pub(crate) page: CdpPage,
    markers: MarkerSet,
    reader: SnapshotReader,
}

impl Harness {
    /// Launches the browser and lands on the deployment's root page.
    pub async fn start(config: HarnessConfig) -> Result<Self, HarnessError> {
        let base_url = config.base_url()?;
        let page = CdpPage::launch(&config.launch_options()).await?;
        page.navigate(base_url.as_str()).await?;

        let markers = MarkerSet::default();
        let reader = SnapshotReader::new(markers.clone(), config.timeouts);
        Ok(Self {
            config,
            base_url,
            page,
            markers,
            reader,
        })
    }

    pub async fn shutdown(self) {
        self.page.close().await;
    }

    /// Fresh read of everything: page snapshot, session, server status,
    /// merged into one state.
    pub async fn current_state(&self) -> ResolvedState {
        let api = InPageApi::new(&self.page);
        StepResolver {
            page: &self.page,
            api: &api,
            reader: &self.reader,
            policy: &self.config.retry,
        }
        .resolve()
        .await
    }

    pub async fn snapshot(&self) -> PageSnapshot {
        self.reader.read_snapshot(&self.page).await
    }

    pub async fn screenshot(&self, path: &Path) -> Result<(), HarnessError> {
        let png = self.page.screenshot().await?;
        tokio::fs::write(path, png).await?;
        info!(path = %path.display(), "screenshot written");
        Ok(())
    }

    /// Signs in through the login form with the configured credentials,
    /// then waits until the session endpoint sees a user.
    pub async fn authenticate(&self) -> Result<(), HarnessError> {
        let (Some(email), Some(password)) = (&self.config.email, &self.config.password) else {
            return Err(HarnessError::MissingCredentials);
        };
        self.authenticate_with(email, password).await
    }

    #[instrument(skip_all)]
    pub async fn authenticate_with(&self, email: &str, password: &str) -> Result<(), HarnessError> {
        let login = self.base_url.join("/login")?;
        self.page.navigate(login.as_str()).await?;
        self.page.settle(self.config.timeouts.settle()).await;

        self.page
            .fill(&Locator::css("input[name='email']"), email)
            .await?;
        self.page
            .fill(&Locator::css("input[name='password']"), password)
            .await?;
        self.page
            .click(&Locator::css("button[type='submit']"))
            .await?;

        let api = InPageApi::new(&self.page);
        let outcome = poll_until(
            self.config.timeouts.postcondition(),
            self.config.timeouts.poll_interval(),
            || async {
                matches!(
                    api.fetch_session().await,
                    Ok(reply) if reply.user.is_some()
                )
            },
        )
        .await;
        if !outcome.satisfied() {
            return Err(HarnessError::AuthenticationFailed {
                timeout_ms: self.config.timeouts.postcondition_ms,
            });
        }
        info!("authenticated");
        Ok(())
    }

    /// One full orchestrated run against the already-established session.
    pub async fn run_onboarding(&self) -> RunReport {
        let input = RunInput {
            personal: self.config.personal.clone(),
            skip_verification: self.config.skip_verification,
        };
        self.run_onboarding_with(&input).await
    }

    pub async fn run_onboarding_with(&self, input: &RunInput) -> RunReport {
        let api = InPageApi::new(&self.page);
        let orchestrator = Orchestrator {
            page: &self.page,
            api: &api,
            reader: &self.reader,
            markers: &self.markers,
            timeouts: &self.config.timeouts,
            policy: &self.config.retry,
            base_url: &self.base_url,
            artifact_dir: self.config.artifact_dir.as_deref(),
        };
        let report = orchestrator.run(input).await;
        self.persist_report(&report).await;
        report
    }

    /// Authenticate first when the initial resolution asks for it, then
    /// run. Credentials stay optional: without them an unauthenticated
    /// state is reported, not fixed.
    pub async fn authenticate_and_onboard(&self) -> Result<RunReport, HarnessError> {
        let report = self.run_onboarding().await;
        if !report.needs_authentication {
            return Ok(report);
        }
        if self.config.email.is_none() {
            warn!("run needs authentication and no credentials are configured");
            return Ok(report);
        }
        self.authenticate().await?;
        Ok(self.run_onboarding().await)
    }

    async fn persist_report(&self, report: &RunReport) {
        let Some(dir) = &self.config.artifact_dir else {
            return;
        };
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            warn!("cannot create artifact dir: {err}");
            return;
        }
        let path = dir.join(format!("run-{}.json", report.run_id));
        match serde_json::to_vec_pretty(report) {
            Ok(bytes) => {
                if let Err(err) = tokio::fs::write(&path, bytes).await {
                    warn!("report write failed: {err}");
                } else {
                    info!(path = %path.display(), "run report written");
                }
            }
            Err(err) => warn!("report serialization failed: {err}"),
        }
    }
}
