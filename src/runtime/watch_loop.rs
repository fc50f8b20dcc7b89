//! # Watch Loop
//!
//! Watches TempoStacks, the objects they own and the storage secrets they
//! reference, and drives reconciliation on every change.

use crate::config::ControllerConfig;
use crate::constants::{LABEL_MANAGED_BY, MANAGED_BY};
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::crd::TempoStack;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::server::ServerState;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::{Client, Resource};
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::{watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Initial delay for throttled watch restarts
const WATCH_BACKOFF_START_MS: u64 = 1_000;

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Stacks a secret change should wake up
///
/// Certificate secrets carry an owner reference; storage secrets are matched
/// against `spec.storage.secret.name` of every cached stack in the same
/// namespace.
pub fn stacks_for_secret(secret: &Secret, stacks: &[Arc<TempoStack>]) -> Vec<ObjectRef<TempoStack>> {
    let namespace = secret.metadata.namespace.as_deref();
    let owned: Vec<_> = secret
        .metadata
        .owner_references
        .iter()
        .flatten()
        .filter(|o| o.kind == TempoStack::kind(&()))
        .map(|o| ObjectRef::new(&o.name).within(namespace.unwrap_or_default()))
        .collect();
    if !owned.is_empty() {
        return owned;
    }

    let Some(name) = secret.metadata.name.as_deref() else {
        return Vec::new();
    };
    stacks
        .iter()
        .filter(|s| s.metadata.namespace.as_deref() == namespace)
        .filter(|s| s.spec.storage.secret.name == name)
        .map(|s| ObjectRef::from_obj(s.as_ref()))
        .collect()
}

/// Run the controller until a shutdown signal arrives
pub async fn run_watch_loop(
    client: Client,
    stacks: Api<TempoStack>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    let backoff_duration_ms = Arc::new(AtomicU64::new(WATCH_BACKOFF_START_MS));
    let max_backoff_ms = config.backoff_max_secs.saturating_mul(1_000);
    let namespace = config.watch_namespace.clone();

    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown_server_state.is_ready.store(false, Ordering::Relaxed);
        }
    });

    loop {
        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        info!(operation = "watch_loop", "Starting controller watch loop...");

        let owned = watcher::Config::default().labels(&format!("{LABEL_MANAGED_BY}={MANAGED_BY}"));
        let controller =
            Controller::new(stacks.clone(), watcher::Config::default().any_semantic());
        let cache: Store<TempoStack> = controller.store();

        let backoff = Arc::clone(&backoff_duration_ms);
        let reconciler_for_reset = Arc::clone(&reconciler);
        let restart_delay = config.watch_restart_delay_secs;
        controller
            .owns(scoped_api::<ConfigMap>(&client, namespace.as_deref()), owned.clone())
            .owns(scoped_api::<Service>(&client, namespace.as_deref()), owned.clone())
            .owns(scoped_api::<Deployment>(&client, namespace.as_deref()), owned.clone())
            .owns(scoped_api::<StatefulSet>(&client, namespace.as_deref()), owned)
            .watches(
                scoped_api::<Secret>(&client, namespace.as_deref()),
                watcher::Config::default(),
                move |secret| stacks_for_secret(&secret, &cache.state()),
            )
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
            .filter_map(move |x| {
                let backoff = Arc::clone(&backoff);
                let reconciler = Arc::clone(&reconciler_for_reset);
                async move {
                    match &x {
                        Ok((obj, _action)) => {
                            backoff.store(WATCH_BACKOFF_START_MS, Ordering::Relaxed);
                            reconciler.reset_backoff(&format!(
                                "{}/{}",
                                obj.namespace.as_deref().unwrap_or("default"),
                                obj.name
                            ));
                            debug!(resource.name = obj.name.as_str(), "watch.event.reconciled");
                            Some(x)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &error_string,
                                &backoff,
                                max_backoff_ms,
                                restart_delay,
                            )
                            .await
                            .map(|()| x)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .await;

        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = config.watch_restart_delay_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}
