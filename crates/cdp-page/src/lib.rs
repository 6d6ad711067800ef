//! Chromium-backed implementation of the page port.
//!
//! Drives a real browser over the DevTools protocol via `chromiumoxide`.
//! CSS locators go through the protocol's element APIs; label and text
//! locators resolve inside the page with injected finder scripts, since
//! the protocol has no first-class notion of "the button that says
//! Continue".

pub mod js;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use page_probe::{Locator, PagePort, ProbeError};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Browser launch knobs, filled from harness configuration.
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub window: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            window: (1280, 900),
        }
    }
}

pub struct CdpPage {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

impl CdpPage {
    /// Launches a browser and opens a blank page. The event handler runs on
    /// its own task for the lifetime of the browser.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, ProbeError> {
        let mut builder = BrowserConfig::builder().window_size(options.window.0, options.window.1);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder.build().map_err(ProbeError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| ProbeError::Browser(err.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("browser handler stopped: {err}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| ProbeError::Browser(err.to_string()))?;
        info!(headless = options.headless, "browser launched");

        Ok(Self {
            browser,
            handler_task,
            page,
        })
    }

    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!("browser close failed: {err}");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }

    /// Evaluates a finder-wrapped script and deserializes its result.
    async fn eval_in_page(&self, script: &str) -> Result<Value, ProbeError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| ProbeError::Evaluation(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl PagePort for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), ProbeError> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|err| ProbeError::Navigation(err.to_string()))?;
        if let Err(err) = self.page.wait_for_navigation().await {
            // Single-page apps often swallow the load event; the snapshot
            // reader's settle covers the gap.
            debug!("wait_for_navigation returned early: {err}");
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), ProbeError> {
        self.page
            .reload()
            .await
            .map_err(|err| ProbeError::Navigation(err.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ProbeError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|err| ProbeError::Browser(err.to_string()))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn body_text(&self) -> Result<String, ProbeError> {
        match self.eval_in_page(js::BODY_TEXT).await? {
            Value::String(text) => Ok(text),
            _ => Ok(String::new()),
        }
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, ProbeError> {
        let value = self.eval_in_page(&js::exists(locator)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, ProbeError> {
        let value = self.eval_in_page(&js::is_visible(locator)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<Option<bool>, ProbeError> {
        let value = self.eval_in_page(&js::is_enabled(locator)).await?;
        Ok(value.as_bool())
    }

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>, ProbeError> {
        let value = self.eval_in_page(&js::text_of(locator)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), ProbeError> {
        // Values go in through the native setter with synthetic input and
        // change events, which controlled (framework-managed) inputs honor
        // where protocol-level typing races their re-renders.
        let outcome = self.eval_in_page(&js::fill(locator, value)).await?;
        if outcome.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(ProbeError::ElementNotFound(locator.to_string()))
        }
    }

    async fn read_value(&self, locator: &Locator) -> Result<Option<String>, ProbeError> {
        let value = self.eval_in_page(&js::read_value(locator)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self, locator: &Locator) -> Result<(), ProbeError> {
        if let Locator::Css(selector) = locator {
            // Real protocol click when a direct selector is available.
            match self.page.find_element(selector.as_str()).await {
                Ok(element) => {
                    element
                        .click()
                        .await
                        .map_err(|err| ProbeError::Browser(err.to_string()))?;
                    return Ok(());
                }
                Err(err) => {
                    debug!(%locator, "protocol click unavailable, falling back to script: {err}");
                }
            }
        }
        let outcome = self.eval_in_page(&js::click(locator)).await?;
        if outcome.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(ProbeError::ElementNotFound(locator.to_string()))
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ProbeError> {
        self.eval_in_page(script).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ProbeError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|err| ProbeError::Browser(err.to_string()))
    }

    async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
