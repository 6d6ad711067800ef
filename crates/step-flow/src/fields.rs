//! Verified field filling.

use page_probe::PagePort;
use pilot_core_types::Timeouts;
use tracing::{debug, warn};

use crate::errors::FlowError;
use crate::strategies::{try_strategies, StrategyChain};

/// Outcome of one field: filled and read back, or skipped (optional field
/// that could not be located or would not hold its value).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FillOutcome {
    Filled,
    SkippedOptional,
}

/// Fill a field and read the value back, retrying up to the configured
/// bound. Required fields fail the step; optional fields log and continue.
pub async fn fill_verified(
    page: &dyn PagePort,
    chain: &StrategyChain,
    value: &str,
    required: bool,
    timeouts: &Timeouts,
) -> Result<FillOutcome, FlowError> {
    let locator = match try_strategies(page, chain).await {
        Ok(locator) => locator,
        Err(err) if !required => {
            warn!(target = %chain.target, "optional field not located, skipping: {err}");
            return Ok(FillOutcome::SkippedOptional);
        }
        Err(err) => return Err(err),
    };

    for attempt in 1..=timeouts.fill_attempts {
        if let Err(err) = page.fill(&locator, value).await {
            if !required {
                warn!(target = %chain.target, "optional field fill failed, skipping: {err}");
                return Ok(FillOutcome::SkippedOptional);
            }
            return Err(err.into());
        }
        page.settle(timeouts.settle()).await;

        let read_back = match page.read_value(&locator).await {
            Ok(read) => read.unwrap_or_default(),
            Err(err) if !required => {
                warn!(target = %chain.target, "optional field read failed, skipping: {err}");
                return Ok(FillOutcome::SkippedOptional);
            }
            Err(err) => return Err(err.into()),
        };
        if read_back == value {
            debug!(target = %chain.target, attempt, "field value verified");
            return Ok(FillOutcome::Filled);
        }
        warn!(
            target = %chain.target,
            attempt,
            expected = value,
            actual = %read_back,
            "field value did not stick"
        );
    }

    if required {
        Err(FlowError::FieldMismatch {
            field: chain.target.clone(),
            attempts: timeouts.fill_attempts,
        })
    } else {
        warn!(target = %chain.target, "optional field never held its value, continuing");
        Ok(FillOutcome::SkippedOptional)
    }
}
