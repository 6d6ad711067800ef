//! DOM surface port and page-state reader.
//!
//! `PagePort` is the only way the rest of the harness touches the live
//! page; `SnapshotReader` turns it into the `PageSnapshot` facts the
//! resolver consumes.

pub mod errors;
#[cfg(any(test, feature = "fake-page"))]
pub mod fake;
pub mod markers;
pub mod ports;
pub mod reader;

pub use errors::ProbeError;
pub use markers::MarkerSet;
pub use ports::{Locator, PagePort};
pub use reader::SnapshotReader;
