//! Bounded, tagged failure recovery.
//!
//! When an executor fails, the engine gathers diagnostics, tries a tag-
//! specific correction, falls back to forced progression, and reports
//! success only when the re-resolved step actually advanced or the error
//! condition cleared.

mod diagnostics;
mod engine;
mod synthetic;

pub use diagnostics::capture_diagnostics;
pub use engine::{RecoveryEngine, RecoveryOutcome};
pub use synthetic::synthetic_value;
