//! Merges the three sources of truth about onboarding progress, which are
//! independent and sometimes contradictory, into one authoritative
//! `ResolvedState`.

mod resolver;
mod verify;

pub use resolver::{resolve_signals, StepResolver};
pub use verify::CompletionVerifier;
