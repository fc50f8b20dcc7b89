//! # Reconciliation Logic
//!
//! One pass over a TempoStack:
//!
//! 1. Fetch the stack; a missing stack ends the pass quietly
//! 2. Fetch and validate the storage secret; problems drive `Degraded`
//! 3. Issue or reuse certificates when internal TLS is enabled
//! 4. Synthesize and apply every desired object
//! 5. Prune owned objects that are no longer desired
//! 6. Drive `Ready`
//!
//! Status is written on every completed pass. Store, certificate and
//! structural spec errors abort the pass without touching status and are
//! retried by the error policy.

mod certificates;
mod prune;

use crate::config::FeatureGates;
use crate::controller::reconciler::status::{build_status, ReconcileOutcome};
use crate::controller::reconciler::types::{ReconcileResult, Reconciler, ReconcilerError};
use crate::controller::reconciler::validation::{
    aggregate_storage_errors, validate_storage_credentials, StorageCredentials,
};
use crate::controller::store::ClusterStore;
use crate::crd::TempoStack;
use crate::manifests::{synthesize, ManifestParams};
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Entry point used by the controller runtime
pub async fn reconcile(
    tempo: Arc<TempoStack>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = tempo.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = tempo.metadata.namespace.as_deref().unwrap_or("default");

    metrics::increment_reconciliations();
    let result = reconcile_stack(
        ctx.store.as_ref(),
        &ctx.config.feature_gates,
        namespace,
        name,
        Utc::now(),
    )
    .await;
    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    let result = result?;
    if result.deleted {
        ctx.forget_backoff(&format!("{namespace}/{name}"));
    }
    debug!(
        resource.name = name,
        resource.namespace = namespace,
        applied = result.applied,
        pruned = result.pruned,
        "Reconciliation pass complete"
    );
    Ok(Action::await_change())
}

/// Run one reconcile pass against a store
///
/// `now` stamps condition transitions and certificate validity.
pub async fn reconcile_stack(
    store: &dyn ClusterStore,
    gates: &FeatureGates,
    namespace: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<ReconcileResult, ReconcilerError> {
    let span = tracing::span!(
        tracing::Level::INFO,
        "reconcile",
        resource.name = name,
        resource.namespace = namespace,
        resource.kind = "TempoStack"
    );
    run_pass(store, gates, namespace, name, now)
        .instrument(span)
        .await
}

async fn run_pass(
    store: &dyn ClusterStore,
    gates: &FeatureGates,
    namespace: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<ReconcileResult, ReconcilerError> {
    let Some(tempo) = store.get_tempostack(namespace, name).await? else {
        debug!("TempoStack {namespace}/{name} no longer exists, nothing to do");
        return Ok(ReconcileResult {
            deleted: true,
            ..Default::default()
        });
    };

    let secret_name = &tempo.spec.storage.secret.name;
    let credentials = match store.get_secret(namespace, secret_name).await? {
        Some(secret) => StorageCredentials::from_secret(&secret),
        None => {
            let message = aggregate_storage_errors(&[format!(
                "storage secret \"{secret_name}\" not found"
            )]);
            return degrade(store, &tempo, namespace, name, message, now).await;
        }
    };

    let errors = validate_storage_credentials(&credentials);
    if !errors.is_empty() {
        return degrade(store, &tempo, namespace, name, aggregate_storage_errors(&errors), now)
            .await;
    }

    let bundle =
        certificates::resolve_certificates(store, gates, namespace, name, now).await?;

    let desired = synthesize(&ManifestParams {
        tempo: &tempo,
        credentials: &credentials,
        certificates: bundle.as_ref(),
        feature_gates: gates,
    })?;

    for object in &desired {
        store.apply(object).await?;
        metrics::increment_objects_applied(object.kind().as_str());
    }
    let pruned = prune::prune_stale(store, namespace, name, &desired).await?;

    let status = build_status(&tempo, &ReconcileOutcome::Ready, now);
    store.patch_status(namespace, name, &status).await?;

    info!(
        applied = desired.len(),
        pruned, "TempoStack {namespace}/{name} is ready"
    );
    Ok(ReconcileResult {
        requeue: false,
        applied: desired.len(),
        pruned,
        deleted: false,
    })
}

/// Record an invalid storage configuration; nothing is applied
async fn degrade(
    store: &dyn ClusterStore,
    tempo: &TempoStack,
    namespace: &str,
    name: &str,
    message: String,
    now: DateTime<Utc>,
) -> Result<ReconcileResult, ReconcilerError> {
    warn!("TempoStack {namespace}/{name} is degraded: {message}");
    metrics::increment_validation_failures();

    let status = build_status(tempo, &ReconcileOutcome::invalid_storage(message), now);
    store.patch_status(namespace, name, &status).await?;
    Ok(ReconcileResult::default())
}
