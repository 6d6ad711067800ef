//! Session and onboarding-status detectors.
//!
//! Both detectors call the backend through `ApiPort` with the same bounded
//! retry policy and absorb failures into their output instead of throwing,
//! so the resolver can always make a best-effort decision.

pub mod client;
pub mod detectors;
pub mod errors;
pub mod ports;

pub use client::{decode_session, decode_status, HttpApi};
pub use detectors::{detect_auth_state, detect_onboarding_status};
pub use errors::DetectError;
pub use ports::{ApiPort, SessionReply, StatusReply};
