//! Selector tables for the wizard's fields and controls.
//!
//! These are the only place that knows concrete selectors; executors work
//! in terms of chains.

use page_probe::{Locator, MarkerSet};

use crate::strategies::{SelectorStrategy, StrategyChain};

/// One form field the personal-info step carries.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
}

pub const PERSONAL_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "first_name",
        label: "First name",
        required: true,
    },
    FieldSpec {
        name: "last_name",
        label: "Last name",
        required: true,
    },
    FieldSpec {
        name: "date_of_birth",
        label: "Date of birth",
        required: false,
    },
    FieldSpec {
        name: "phone",
        label: "Phone",
        required: false,
    },
    FieldSpec {
        name: "address_line1",
        label: "Address",
        required: false,
    },
    FieldSpec {
        name: "city",
        label: "City",
        required: false,
    },
    FieldSpec {
        name: "state",
        label: "State",
        required: false,
    },
    FieldSpec {
        name: "postal_code",
        label: "ZIP code",
        required: false,
    },
];

/// Standard three-way chain for a named input: name attribute, id, then
/// visible label.
pub fn field_chain(spec: &FieldSpec) -> StrategyChain {
    StrategyChain::new(
        format!("field '{}'", spec.name),
        vec![
            SelectorStrategy::present("name-attr", Locator::css(format!("input[name='{}']", spec.name))),
            SelectorStrategy::present("id", Locator::css(format!("#{}", spec.name))),
            SelectorStrategy::present("label", Locator::labelled(spec.label)),
        ],
    )
}

/// The step's progression control. Located on presence, not
/// interactability: a disabled submit must surface as a logic error, not
/// be silently skipped over.
pub fn continue_chain(markers: &MarkerSet) -> StrategyChain {
    StrategyChain::new(
        "continue button",
        vec![
            SelectorStrategy::present(
                "testid",
                Locator::css("[data-testid='continue-button']"),
            ),
            SelectorStrategy::present("submit", Locator::css("button[type='submit']")),
            SelectorStrategy::present("label", Locator::text(markers.continue_label.clone())),
        ],
    )
}

pub fn signature_chain() -> StrategyChain {
    StrategyChain::new(
        "signature input",
        vec![
            SelectorStrategy::present("name-attr", Locator::css("input[name='signature']")),
            SelectorStrategy::present("testid", Locator::css("[data-testid='signature-input']")),
            SelectorStrategy::present("label", Locator::labelled("Full legal name")),
        ],
    )
}

pub fn signature_confirm_chain() -> StrategyChain {
    StrategyChain::new(
        "signature confirmation",
        vec![
            SelectorStrategy::present("name-attr", Locator::css("input[name='signature_confirm']")),
            SelectorStrategy::present(
                "testid",
                Locator::css("[data-testid='signature-confirm']"),
            ),
        ],
    )
}

/// Consent checkboxes on the legal step. `required` mirrors the form's
/// client-side validation.
pub fn consent_chains() -> Vec<(StrategyChain, bool)> {
    vec![
        (
            StrategyChain::new(
                "terms consent",
                vec![
                    SelectorStrategy::present("name-attr", Locator::css("input[name='terms']")),
                    SelectorStrategy::present(
                        "testid",
                        Locator::css("[data-testid='consent-terms']"),
                    ),
                    SelectorStrategy::present("label", Locator::labelled("I agree to the terms")),
                ],
            ),
            true,
        ),
        (
            StrategyChain::new(
                "privacy consent",
                vec![
                    SelectorStrategy::present("name-attr", Locator::css("input[name='privacy']")),
                    SelectorStrategy::present(
                        "testid",
                        Locator::css("[data-testid='consent-privacy']"),
                    ),
                ],
            ),
            false,
        ),
    ]
}

pub fn start_verification_chain() -> StrategyChain {
    StrategyChain::new(
        "start verification",
        vec![
            SelectorStrategy::interactable(
                "testid",
                Locator::css("[data-testid='start-verification']"),
            ),
            SelectorStrategy::interactable("label", Locator::text("Start Verification")),
            SelectorStrategy::interactable("verify-label", Locator::text("Verify Identity")),
        ],
    )
}

pub fn skip_verification_chain() -> StrategyChain {
    StrategyChain::new(
        "skip verification",
        vec![
            SelectorStrategy::interactable(
                "testid",
                Locator::css("[data-testid='skip-verification']"),
            ),
            SelectorStrategy::interactable("label", Locator::text("Skip for now")),
        ],
    )
}

/// Anything that looks like a progression control, for recovery's forced
/// progression fallback.
pub fn any_progression_chain(markers: &MarkerSet) -> StrategyChain {
    StrategyChain::new(
        "any progression control",
        vec![
            SelectorStrategy::interactable("continue", Locator::text(markers.continue_label.clone())),
            SelectorStrategy::interactable("complete", Locator::text(markers.complete_label.clone())),
            SelectorStrategy::interactable("next", Locator::text("Next")),
            SelectorStrategy::interactable("submit", Locator::css("button[type='submit']")),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_are_first_and_last_name() {
        let required: Vec<_> = PERSONAL_FIELDS
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name)
            .collect();
        assert_eq!(required, vec!["first_name", "last_name"]);
    }

    #[test]
    fn field_chain_prefers_name_attribute() {
        let chain = field_chain(&PERSONAL_FIELDS[0]);
        assert_eq!(chain.strategies[0].name, "name-attr");
        assert_eq!(
            chain.strategies[0].locator,
            Locator::css("input[name='first_name']")
        );
        assert_eq!(chain.strategies.len(), 3);
    }
}
