//! # Reconciler
//!
//! Reconciliation logic for `TempoStack` resources.
//!
//! The reconciler:
//! - Validates the object storage secret a stack references
//! - Issues and rotates internal certificates when the TLS feature gates ask for them
//! - Applies the stack's ConfigMaps, Secrets, Services and workloads
//! - Prunes owned objects the spec no longer produces
//! - Reports the outcome through status conditions

pub mod reconcile;
pub mod status;
pub mod types;
pub mod validation;

pub use reconcile::{reconcile, reconcile_stack};
pub use types::{BackoffState, ReconcileResult, Reconciler, ReconcilerError};
