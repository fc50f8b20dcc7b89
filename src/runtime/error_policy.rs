//! # Error Policy
//!
//! Backoff for failed reconcile passes and classification of watch stream
//! errors.

use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::TempoStack;
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Fallback delay when the backoff table cannot be locked
const FALLBACK_BACKOFF_SECS: u64 = 60;

/// Key under which per-resource backoff state is tracked
pub fn resource_key(obj: &TempoStack) -> String {
    format!(
        "{}/{}",
        obj.metadata.namespace.as_deref().unwrap_or("default"),
        obj.metadata.name.as_deref().unwrap_or("unknown")
    )
}

/// Requeue a failed stack with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing stack never slows
/// down the others.
pub fn handle_reconciliation_error(
    obj: Arc<TempoStack>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let key = resource_key(&obj);
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.key = key.as_str(),
        error.kind = error.kind(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {}", key, error);
    metrics::increment_reconciliation_errors(error.kind());

    let (backoff_seconds, error_count) = next_backoff(&ctx, &key);
    let next_trigger_time =
        chrono::Utc::now() + chrono::Duration::seconds(backoff_seconds as i64);
    info!(
        "Retrying {} in {}s at {} (error count: {})",
        key,
        backoff_seconds,
        next_trigger_time.to_rfc3339(),
        error_count
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

fn next_backoff(ctx: &Reconciler, key: &str) -> (u64, u32) {
    match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(key.to_string()).or_insert_with(|| {
                BackoffState::new(ctx.config.backoff_min_secs, ctx.config.backoff_max_secs)
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (FALLBACK_BACKOFF_SECS, 0)
        }
    }
}

/// Broad classes of watch stream failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

/// Classify a watch error by its rendered message
///
/// Not-found is checked first: a 404 returned as plain text surfaces as a
/// decode error that also mentions `WatchFailed`.
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    let contains_any = |needles: &[&str]| needles.iter().any(|n| error_string.contains(n));

    let is_not_found = contains_any(&["ObjectNotFound", "404", "not found"]);
    if contains_any(&["401", "Unauthorized"]) && !is_not_found {
        WatchErrorKind::Unauthorized
    } else if contains_any(&["410", "too old resource version", "Expired", "Gone"]) {
        WatchErrorKind::Expired
    } else if contains_any(&["429", "storage is (re)initializing", "TooManyRequests"]) {
        WatchErrorKind::Throttled
    } else if is_not_found {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Handle one watch stream error
///
/// Returns `None` to drop the event and let the stream restart, `Some(())`
/// to keep it.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match classify_watch_error(error_string) {
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized); RBAC may have been revoked or the token expired");
            error!("Check that the controller ClusterRole still grants list/watch on tempostacks and secrets:");
            error!("  kubectl auth can-i watch tempostacks.tempo.grafana.com --as=system:serviceaccount:<namespace>:tempo-controller --all-namespaces");
            warn!(
                "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay_secs
            );
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410), watch will restart");
            None
        }
        WatchErrorKind::Throttled => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server throttling or reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            backoff.store(
                current_backoff.saturating_mul(2).min(max_backoff_ms),
                Ordering::Relaxed,
            );
            None
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Resource not found (404); the stack was deleted or the CRD is missing. Error: {}",
                error_string
            );
            Some(())
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::store::{ClusterStore, ObjectRef, StoreError};
    use crate::crd::{TempoStackSpec, TempoStackStatus};
    use crate::manifests::DesiredObject;
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{ConfigMap, Secret};

    struct NullStore;

    #[async_trait]
    impl ClusterStore for NullStore {
        async fn get_tempostack(&self, _: &str, _: &str) -> Result<Option<TempoStack>, StoreError> {
            Ok(None)
        }
        async fn get_secret(&self, _: &str, _: &str) -> Result<Option<Secret>, StoreError> {
            Ok(None)
        }
        async fn get_config_map(&self, _: &str, _: &str) -> Result<Option<ConfigMap>, StoreError> {
            Ok(None)
        }
        async fn apply(&self, _: &DesiredObject) -> Result<(), StoreError> {
            Ok(())
        }
        async fn list_owned(&self, _: &str, _: &str) -> Result<Vec<ObjectRef>, StoreError> {
            Ok(Vec::new())
        }
        async fn delete(&self, _: &str, _: &ObjectRef) -> Result<(), StoreError> {
            Ok(())
        }
        async fn patch_status(&self, _: &str, _: &str, _: &TempoStackStatus) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn stack() -> Arc<TempoStack> {
        let mut stack = TempoStack::new("simplest", TempoStackSpec::default());
        stack.metadata.namespace = Some("observability".to_string());
        Arc::new(stack)
    }

    #[test]
    fn test_classify_watch_errors() {
        assert_eq!(classify_watch_error("ErrorResponse { code: 401 }"), WatchErrorKind::Unauthorized);
        assert_eq!(classify_watch_error("too old resource version: 5 (10)"), WatchErrorKind::Expired);
        assert_eq!(classify_watch_error("TooManyRequests"), WatchErrorKind::Throttled);
        assert_eq!(classify_watch_error("invalid type: integer `404`"), WatchErrorKind::NotFound);
        assert_eq!(classify_watch_error("connection reset"), WatchErrorKind::Other);
    }

    #[test]
    fn test_not_found_wins_over_unauthorized() {
        assert_eq!(
            classify_watch_error("WatchFailed: 401 ... ObjectNotFound"),
            WatchErrorKind::NotFound
        );
    }

    #[test]
    fn test_backoff_grows_per_resource_and_resets() {
        let config = ControllerConfig {
            backoff_min_secs: 5,
            backoff_max_secs: 60,
            ..ControllerConfig::default()
        };
        let ctx = Arc::new(Reconciler::new(Arc::new(NullStore), config));
        let error = ReconcilerError::Store(StoreError::Unavailable("down".to_string()));

        let delays: Vec<_> = (0..4)
            .map(|_| handle_reconciliation_error(stack(), &error, Arc::clone(&ctx)))
            .collect();
        assert_eq!(delays[0], Action::requeue(Duration::from_secs(5)));
        assert_eq!(delays[2], Action::requeue(Duration::from_secs(10)));
        assert_eq!(delays[3], Action::requeue(Duration::from_secs(15)));

        ctx.reset_backoff(&resource_key(&stack()));
        assert_eq!(
            handle_reconciliation_error(stack(), &error, ctx),
            Action::requeue(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn test_throttled_doubles_backoff_up_to_max() {
        let backoff = Arc::new(AtomicU64::new(1));
        assert!(handle_watch_stream_error("429", &backoff, 3, 0).await.is_none());
        assert_eq!(backoff.load(Ordering::Relaxed), 2);
        assert!(handle_watch_stream_error("429", &backoff, 3, 0).await.is_none());
        assert_eq!(backoff.load(Ordering::Relaxed), 3);
    }
}
