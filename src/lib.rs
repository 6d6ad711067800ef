//! Onboard-pilot: a resumable browser-automation harness for a multi-step
//! onboarding wizard.
//!
//! The library wires the workspace crates into one surface: resolve where
//! the wizard stands from page, session, and server signals; drive the
//! remaining steps through a real browser; verify every advance with an
//! independent signal; and recover once per failed step before stopping.

pub mod api_bridge;
pub mod config;
pub mod errors;
pub mod harness;
pub mod orchestrator;
pub mod surface;

pub use api_bridge::InPageApi;
pub use config::HarnessConfig;
pub use errors::HarnessError;
pub use harness::Harness;
pub use orchestrator::Orchestrator;
pub use surface::{Surface, SurfaceResult};

pub use pilot_core_types::{
    OnboardingStep, PersonalInfo, ResolvedState, RunReport, StepResult, StepStatus,
};
pub use step_flow::RunInput;
