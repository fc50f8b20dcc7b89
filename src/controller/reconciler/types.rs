//! # Types
//!
//! Core types for the reconciler.

use crate::certificates::CertificateError;
use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::store::{ClusterStore, StoreError};
use crate::manifests::SynthesisError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failures that abort a reconcile pass
///
/// Configuration problems are not errors: they end up in the Degraded
/// condition and the pass completes. Everything here is retried by the
/// error policy.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("cluster store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid TempoStack spec: {0}")]
    InvalidSpec(#[from] SynthesisError),

    #[error("certificate management failed: {0}")]
    Certificates(#[from] CertificateError),
}

impl ReconcilerError {
    /// Short label for metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcilerError::Store(_) => "store",
            ReconcilerError::InvalidSpec(_) => "invalid-spec",
            ReconcilerError::Certificates(_) => "certificates",
        }
    }
}

/// Result of one completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Always false: every pass runs to completion
    pub requeue: bool,
    /// Objects applied this pass
    pub applied: usize,
    /// Owned objects deleted because they are no longer desired
    pub pruned: usize,
    /// The stack no longer exists
    pub deleted: bool,
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared context handed to every reconcile and error-policy call
#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn ClusterStore>,
    pub config: ControllerConfig,
    // Keyed by namespace/name; grown by the error policy, dropped on deletion
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn ClusterStore>, config: ControllerConfig) -> Self {
        Self {
            store,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Drop all backoff state of a resource that no longer exists
    pub fn forget_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }

    /// Forget the error streak of a resource after a successful pass
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}
