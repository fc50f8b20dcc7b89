//! # Status Management
//!
//! Drives the TempoStack status: the ordered Ready/Degraded condition list
//! and the reported tempo version.

mod conditions;
mod status;

pub use conditions::{apply_outcome, format_timestamp, ConditionSet, ReconcileOutcome};
pub use status::{build_status, reported_version};
