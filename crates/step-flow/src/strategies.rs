//! Multi-strategy element targeting.
//!
//! The wizard's test hooks are inconsistent across refactors, so each
//! target carries an ordered list of semantically-equivalent locators.
//! Strategies are data; one generic routine consumes them, so new
//! fallbacks can be added without touching executor logic.

use page_probe::{Locator, PagePort};
use tracing::{debug, info, warn};

use crate::errors::FlowError;

/// One named way to find a target element.
#[derive(Clone, Debug)]
pub struct SelectorStrategy {
    pub name: &'static str,
    pub locator: Locator,
    /// Require the element to be visible and not disabled, not merely
    /// present in the DOM.
    pub verify_interactable: bool,
}

impl SelectorStrategy {
    pub fn present(name: &'static str, locator: Locator) -> Self {
        Self {
            name,
            locator,
            verify_interactable: false,
        }
    }

    pub fn interactable(name: &'static str, locator: Locator) -> Self {
        Self {
            name,
            locator,
            verify_interactable: true,
        }
    }
}

/// Ordered fallback chain for one target.
#[derive(Clone, Debug)]
pub struct StrategyChain {
    pub target: String,
    pub strategies: Vec<SelectorStrategy>,
}

impl StrategyChain {
    pub fn new(target: impl Into<String>, strategies: Vec<SelectorStrategy>) -> Self {
        Self {
            target: target.into(),
            strategies,
        }
    }
}

/// Try each strategy in order; the first whose locator matches (and, when
/// required, is interactable) wins.
pub async fn try_strategies(
    page: &dyn PagePort,
    chain: &StrategyChain,
) -> Result<Locator, FlowError> {
    for strategy in &chain.strategies {
        match page.exists(&strategy.locator).await {
            Ok(true) => {
                if strategy.verify_interactable {
                    let visible = page.is_visible(&strategy.locator).await.unwrap_or(false);
                    let enabled = page
                        .is_enabled(&strategy.locator)
                        .await
                        .ok()
                        .flatten()
                        .unwrap_or(true);
                    if !visible || !enabled {
                        debug!(
                            target = %chain.target,
                            strategy = strategy.name,
                            visible,
                            enabled,
                            "strategy matched but element not interactable"
                        );
                        continue;
                    }
                }
                info!(
                    target = %chain.target,
                    strategy = strategy.name,
                    locator = %strategy.locator,
                    "target resolved"
                );
                return Ok(strategy.locator.clone());
            }
            Ok(false) => {
                debug!(target = %chain.target, strategy = strategy.name, "strategy missed");
            }
            Err(err) => {
                warn!(target = %chain.target, strategy = strategy.name, "strategy errored: {err}");
            }
        }
    }
    Err(FlowError::ElementNotFound {
        target: chain.target.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_probe::fake::{Scene, ScriptedPage};

    fn chain() -> StrategyChain {
        StrategyChain::new(
            "continue button",
            vec![
                SelectorStrategy::interactable(
                    "testid",
                    Locator::css("[data-testid='continue-button']"),
                ),
                SelectorStrategy::interactable("submit", Locator::css("button[type='submit']")),
                SelectorStrategy::interactable("label", Locator::text("Continue")),
            ],
        )
    }

    #[tokio::test]
    async fn falls_back_to_later_strategy() {
        // Neither CSS hook exists; the text label does.
        let page = ScriptedPage::single("https://x.test", "Fill the form\nContinue");
        let found = try_strategies(&page, &chain()).await.unwrap();
        assert_eq!(found, Locator::text("Continue"));
    }

    #[tokio::test]
    async fn first_matching_strategy_wins() {
        let testid = Locator::css("[data-testid='continue-button']");
        let page = ScriptedPage::new(vec![
            Scene::new("https://x.test", "Continue").with_present(&testid)
        ]);
        let found = try_strategies(&page, &chain()).await.unwrap();
        assert_eq!(found, testid);
    }

    #[tokio::test]
    async fn disabled_element_is_skipped() {
        let submit = Locator::css("button[type='submit']");
        let page = ScriptedPage::new(vec![
            Scene::new("https://x.test", "no label here").with_disabled(&submit)
        ]);
        let result = try_strategies(&page, &chain()).await;
        assert!(matches!(result, Err(FlowError::ElementNotFound { .. })));
    }

    #[tokio::test]
    async fn exhausted_chain_reports_target_name() {
        let page = ScriptedPage::single("https://x.test", "nothing relevant");
        match try_strategies(&page, &chain()).await {
            Err(FlowError::ElementNotFound { target }) => assert_eq!(target, "continue button"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
