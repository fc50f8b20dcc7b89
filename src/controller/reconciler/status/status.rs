//! # Status Updates
//!
//! Builds the status written back after every reconcile pass.

use super::conditions::{apply_outcome, ReconcileOutcome};
use crate::crd::{TempoStack, TempoStackStatus};
use chrono::{DateTime, Utc};

/// Compute the next status of a TempoStack from the outcome of a pass
pub fn build_status(
    tempo: &TempoStack,
    outcome: &ReconcileOutcome,
    now: DateTime<Utc>,
) -> TempoStackStatus {
    let current = tempo
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();

    TempoStackStatus {
        tempo_version: reported_version(&tempo.spec.images.tempo),
        conditions: apply_outcome(current, outcome, now),
    }
}

/// Version reported in status, taken from the tempo image tag
///
/// `docker.io/grafana/tempo:1.5.0` reports `1.5.0`. Digests are ignored and an
/// untagged image reports an empty version.
pub fn reported_version(image: &str) -> String {
    let without_digest = image.split('@').next().unwrap_or(image);
    let last_segment = without_digest.rsplit('/').next().unwrap_or(without_digest);
    last_segment
        .split_once(':')
        .map(|(_, tag)| tag.trim_start_matches('v').to_string())
        .unwrap_or_default()
}
