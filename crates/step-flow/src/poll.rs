//! Bounded polling.
//!
//! Every wait in the harness goes through here: an explicit timeout, a
//! fixed interval, and a result type instead of a boolean coupled to log
//! side effects.

use std::future::Future;
use std::time::Duration;

use page_probe::{Locator, PagePort};
use tokio::time::{sleep, Instant};
use tracing::trace;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    Satisfied,
    TimedOut,
}

impl PollOutcome {
    pub fn satisfied(self) -> bool {
        self == PollOutcome::Satisfied
    }
}

/// Poll `probe` until it returns true or `timeout` elapses. The probe is
/// always run at least once, so a zero timeout still observes the current
/// state.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await {
            return PollOutcome::Satisfied;
        }
        if Instant::now() >= deadline {
            trace!("poll deadline reached");
            return PollOutcome::TimedOut;
        }
        sleep(interval).await;
    }
}

/// Poll for a locator to exist on the page. Probe failures count as "not
/// yet" rather than aborting the wait.
pub async fn wait_for_locator(
    page: &dyn PagePort,
    locator: &Locator,
    timeout: Duration,
    interval: Duration,
) -> PollOutcome {
    poll_until(timeout, interval, || async {
        page.exists(locator).await.unwrap_or(false)
    })
    .await
}
