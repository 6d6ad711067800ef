//! Step executors for the onboarding wizard.
//!
//! Each executor drives one wizard step through the page port: wait for
//! the step's marker, fill and click through ordered selector-strategy
//! chains, submit only through an enabled control, then block until the
//! next step's marker appears.

pub mod errors;
pub mod executor;
pub mod fields;
pub mod poll;
pub mod selectors;
pub mod strategies;
pub mod verify_machine;

pub use errors::FlowError;
pub use executor::{
    executors_for, LegalConsentExecutor, PersonalInfoExecutor, RunInput, SignatureExecutor,
    StepDeps, StepExecutor, VerificationExecutor,
};
pub use poll::{poll_until, wait_for_locator, PollOutcome};
pub use strategies::{try_strategies, SelectorStrategy, StrategyChain};
