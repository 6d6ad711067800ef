//! Harness configuration.
//!
//! Layered the usual way: built-in defaults, then an optional config file,
//! then `ONBOARD__*` environment variables. Credentials only ever come
//! from the file or the environment.

use std::path::{Path, PathBuf};

use cdp_page::LaunchOptions;
use pilot_core_types::{PersonalInfo, RetryPolicy, Timeouts};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::HarnessError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root of the deployment under test.
    pub base_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub headless: bool,
    /// Explicit browser binary; autodetected when unset.
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    /// Failure screenshots and run reports land here.
    pub artifact_dir: Option<PathBuf>,
    pub skip_verification: bool,
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
    pub personal: PersonalInfo,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            email: None,
            password: None,
            headless: true,
            executable: None,
            user_data_dir: None,
            artifact_dir: None,
            skip_verification: false,
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            personal: PersonalInfo::default(),
        }
    }
}

impl HarnessConfig {
    /// Defaults, overlaid with the file at `path` (when given) and
    /// `ONBOARD__*` environment variables, e.g. `ONBOARD__BASE_URL` or
    /// `ONBOARD__TIMEOUTS__SETTLE_MS`.
    pub fn load(path: Option<&Path>) -> Result<Self, HarnessError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).required(true),
            );
        } else {
            builder = builder.add_source(
                config::File::with_name("onboard-pilot").required(false),
            );
        }
        builder = builder.add_source(config::Environment::with_prefix("ONBOARD").separator("__"));

        builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|err| HarnessError::Config(err.to_string()))
    }

    pub fn base_url(&self) -> Result<Url, HarnessError> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            executable: self.executable.clone(),
            user_data_dir: self.user_data_dir.clone(),
            ..LaunchOptions::default()
        }
    }
}
