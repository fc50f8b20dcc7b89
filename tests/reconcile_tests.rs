//! # Reconcile Tests
//!
//! End-to-end reconcile passes against the in-memory store.
//!
//! These tests verify:
//! - A valid stack converges to Ready with the expected objects
//! - Storage secret problems drive Degraded and apply nothing
//! - Condition order and transition times across Ready/Degraded flips
//! - Certificate issuance, reuse and pruning
//! - Gateway enable/disable and pruning of stale objects
//! - Transport errors propagate without a status write

mod common;

use common::*;
use tempo_controller::config::FeatureGates;
use tempo_controller::constants::{LABEL_INSTANCE, LABEL_MANAGED_BY};
use tempo_controller::controller::reconciler::status::format_timestamp;
use std::sync::Arc;
use tempo_controller::config::ControllerConfig;
use tempo_controller::controller::reconciler::{
    reconcile, reconcile_stack, BackoffState, ReconcileResult, Reconciler, ReconcilerError,
};
use tempo_controller::crd::{ConditionStatus, TempoStackStatus};
use tempo_controller::manifests::{DesiredObject, ObjectKind};

async fn pass(store: &MemoryStore, gates: &FeatureGates, secs: i64) -> ReconcileResult {
    reconcile_stack(store, gates, NAMESPACE, INSTANCE, at(secs))
        .await
        .expect("reconcile pass succeeds")
}

fn seeded(secret: k8s_openapi::api::core::v1::Secret) -> MemoryStore {
    let store = MemoryStore::new();
    store.put_stack(minimal_stack());
    store.put_secret(secret);
    store
}

fn status(store: &MemoryStore) -> TempoStackStatus {
    store
        .stack(NAMESPACE, INSTANCE)
        .and_then(|s| s.status)
        .expect("status written")
}

#[tokio::test]
async fn test_valid_stack_becomes_ready() {
    let store = seeded(valid_storage_secret());
    let result = pass(&store, &FeatureGates::default(), 0).await;

    assert!(!result.requeue);
    assert_eq!(result.pruned, 0);
    assert_eq!(result.applied, store.objects().len());

    let status = status(&store);
    assert_eq!(status.tempo_version, "2.3.1");
    assert_eq!(status.conditions.len(), 1);
    let ready = &status.conditions[0];
    assert_eq!(ready.r#type, "Ready");
    assert_eq!(ready.status, ConditionStatus::True);
    assert_eq!(ready.reason, "Ready");
    assert_eq!(ready.message, "All components are operational");
    assert_eq!(ready.last_transition_time, format_timestamp(at(0)));

    assert!(!store.names_of(ObjectKind::ConfigMap).is_empty());
    assert!(!store.names_of(ObjectKind::Deployment).is_empty());
    assert_eq!(
        store.names_of(ObjectKind::StatefulSet),
        vec!["tempo-simplest-ingester".to_string()]
    );
}

#[tokio::test]
async fn test_every_object_carries_discovery_labels_and_owner() {
    let store = seeded(valid_storage_secret());
    pass(&store, &FeatureGates::default(), 0).await;

    for object in store.objects() {
        let labels = object.labels().expect("labels set");
        assert_eq!(labels.get(LABEL_INSTANCE).map(String::as_str), Some(INSTANCE));
        assert_eq!(
            labels.get(LABEL_MANAGED_BY).map(String::as_str),
            Some("tempo-controller")
        );
        let owners = object
            .metadata()
            .owner_references
            .clone()
            .expect("owner reference set");
        assert_eq!(owners[0].kind, "TempoStack");
        assert_eq!(owners[0].name, INSTANCE);
        assert_eq!(owners[0].controller, Some(true));
    }
}

#[tokio::test]
async fn test_missing_storage_secret_degrades() {
    let store = MemoryStore::new();
    store.put_stack(minimal_stack());
    let result = pass(&store, &FeatureGates::default(), 0).await;

    assert_eq!(result, ReconcileResult::default());
    assert!(store.objects().is_empty());

    let status = status(&store);
    assert_eq!(status.conditions.len(), 1);
    let degraded = &status.conditions[0];
    assert_eq!(degraded.r#type, "Degraded");
    assert_eq!(degraded.status, ConditionStatus::True);
    assert_eq!(degraded.reason, "InvalidStorageConfig");
    assert_eq!(
        degraded.message,
        "invalid storage secret: storage secret \"minio\" not found"
    );
}

#[tokio::test]
async fn test_invalid_secret_reports_every_error_in_check_order() {
    let store = seeded(storage_secret(&[
        ("endpoint", "not a url"),
        ("bucket", "tempo"),
        ("access_key_secret", "supersecret"),
    ]));
    pass(&store, &FeatureGates::default(), 0).await;

    assert!(store.objects().is_empty());
    let status = status(&store);
    assert_eq!(
        status.conditions[0].message,
        "invalid storage secret: \"endpoint\" field of storage secret must be a valid URL, \
         storage secret must contain \"access_key_id\" field"
    );
}

#[tokio::test]
async fn test_condition_order_across_flips() {
    let store = seeded(valid_storage_secret());
    let gates = FeatureGates::default();

    pass(&store, &gates, 0).await;

    store.put_secret(storage_secret(&[("endpoint", "http://minio:9000")]));
    pass(&store, &gates, 10).await;
    let degraded_status = status(&store);
    let degraded_message = degraded_status.conditions[1].message.clone();
    assert_eq!(degraded_status.conditions[0].r#type, "Ready");
    assert_eq!(degraded_status.conditions[0].status, ConditionStatus::False);
    assert_eq!(degraded_status.conditions[0].last_transition_time, format_timestamp(at(10)));
    assert_eq!(degraded_status.conditions[1].r#type, "Degraded");
    assert_eq!(degraded_status.conditions[1].status, ConditionStatus::True);

    store.put_secret(valid_storage_secret());
    pass(&store, &gates, 20).await;
    let recovered = status(&store);
    assert_eq!(recovered.conditions.len(), 2);
    assert_eq!(recovered.conditions[0].r#type, "Ready");
    assert_eq!(recovered.conditions[0].status, ConditionStatus::True);
    assert_eq!(recovered.conditions[1].r#type, "Degraded");
    assert_eq!(recovered.conditions[1].status, ConditionStatus::False);
    assert_eq!(recovered.conditions[1].reason, "InvalidStorageConfig");
    assert_eq!(recovered.conditions[1].message, degraded_message);
    assert_eq!(recovered.conditions[1].last_transition_time, format_timestamp(at(20)));
}

#[tokio::test]
async fn test_status_written_every_pass_without_moving_transition_time() {
    let store = seeded(valid_storage_secret());
    let gates = FeatureGates::default();

    pass(&store, &gates, 0).await;
    pass(&store, &gates, 30).await;

    let writes = store.status_writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0], writes[1]);
    assert_eq!(writes[1].conditions[0].last_transition_time, format_timestamp(at(0)));
}

#[tokio::test]
async fn test_degraded_message_refreshes_without_moving_transition_time() {
    let store = seeded(storage_secret(&[("endpoint", "http://minio:9000")]));
    let gates = FeatureGates::default();

    pass(&store, &gates, 0).await;
    store.put_secret(storage_secret(&[
        ("endpoint", "http://minio:9000"),
        ("bucket", "tempo"),
    ]));
    pass(&store, &gates, 15).await;

    let degraded = &status(&store).conditions[0];
    assert_eq!(
        degraded.message,
        "invalid storage secret: storage secret must contain \"access_key_id\" field, \
         storage secret must contain \"access_key_secret\" field"
    );
    assert_eq!(degraded.last_transition_time, format_timestamp(at(0)));
}

#[tokio::test]
async fn test_missing_stack_is_a_quiet_no_op() {
    let store = MemoryStore::new();
    let result = pass(&store, &FeatureGates::default(), 0).await;
    assert_eq!(
        result,
        ReconcileResult {
            deleted: true,
            ..Default::default()
        }
    );
    assert!(store.status_writes().is_empty());
}

#[tokio::test]
async fn test_deleted_stack_drops_backoff_state() {
    let ctx = Arc::new(Reconciler::new(
        Arc::new(MemoryStore::new()),
        ControllerConfig::default(),
    ));
    let key = format!("{NAMESPACE}/{INSTANCE}");
    ctx.backoff_states
        .lock()
        .unwrap()
        .insert(key.clone(), BackoffState::new(5, 300));
    ctx.backoff_states
        .lock()
        .unwrap()
        .insert("other/stack".to_string(), BackoffState::new(5, 300));

    reconcile(Arc::new(minimal_stack()), Arc::clone(&ctx))
        .await
        .expect("missing stack is not an error");

    let states = ctx.backoff_states.lock().unwrap();
    assert!(!states.contains_key(&key));
    assert!(states.contains_key("other/stack"));
}

#[tokio::test]
async fn test_transport_error_propagates_without_status_write() {
    let store = seeded(valid_storage_secret());
    store.set_failing(true);

    let err = reconcile_stack(&store, &FeatureGates::default(), NAMESPACE, INSTANCE, at(0))
        .await
        .expect_err("store failure surfaces");
    assert!(matches!(err, ReconcilerError::Store(_)));
    assert_eq!(err.kind(), "store");

    store.set_failing(false);
    assert!(store.status_writes().is_empty());
}

#[tokio::test]
async fn test_invalid_quantity_is_fatal_for_the_pass() {
    let store = seeded(valid_storage_secret());
    store.update_stack(|s| s.spec.storage_size = "lots".to_string());

    let err = reconcile_stack(&store, &FeatureGates::default(), NAMESPACE, INSTANCE, at(0))
        .await
        .expect_err("structural error surfaces");
    assert_eq!(err.kind(), "invalid-spec");
    assert!(store.objects().is_empty());
    assert!(store.status_writes().is_empty());
}

#[tokio::test]
async fn test_tls_artifacts_are_created_for_every_component() {
    let store = seeded(valid_storage_secret());
    pass(&store, &tls_gates(), 0).await;

    let secrets = store.names_of(ObjectKind::Secret);
    for component in ["distributor", "ingester", "compactor", "querier", "query-frontend"] {
        for channel in ["grpc", "http"] {
            let name = format!("tempo-simplest-{component}-{channel}");
            assert!(secrets.contains(&name), "missing {name}");
        }
    }
    assert!(secrets.contains(&"tempo-simplest-signing-ca".to_string()));
    assert!(store
        .names_of(ObjectKind::ConfigMap)
        .contains(&"tempo-simplest-ca-bundle".to_string()));
}

#[tokio::test]
async fn test_certificates_are_reused_across_passes() {
    let store = seeded(valid_storage_secret());
    let gates = tls_gates();

    pass(&store, &gates, 0).await;
    let first_ca = store.secret("tempo-simplest-signing-ca").expect("ca stored");
    let first_leaf = store.secret("tempo-simplest-ingester-grpc").expect("leaf stored");

    pass(&store, &gates, 3600).await;
    assert_eq!(store.secret("tempo-simplest-signing-ca"), Some(first_ca));
    assert_eq!(store.secret("tempo-simplest-ingester-grpc"), Some(first_leaf));
}

#[tokio::test]
async fn test_disabling_tls_prunes_certificate_objects() {
    let store = seeded(valid_storage_secret());
    pass(&store, &tls_gates(), 0).await;

    let result = pass(&store, &FeatureGates::default(), 60).await;
    assert_eq!(result.pruned, 12);
    assert!(store.names_of(ObjectKind::Secret).is_empty());
    assert_eq!(
        store.names_of(ObjectKind::ConfigMap),
        vec!["tempo-simplest".to_string()]
    );
}

#[tokio::test]
async fn test_gateway_toggle_creates_and_prunes_objects() {
    let store = seeded(valid_storage_secret());
    let gates = FeatureGates::default();

    store.update_stack(|s| s.spec.template.gateway.enabled = true);
    pass(&store, &gates, 0).await;
    assert!(store
        .object(ObjectKind::Deployment, "tempo-simplest-gateway")
        .is_some());
    assert!(store
        .object(ObjectKind::Service, "tempo-simplest-distributor-discovery")
        .is_some());

    store.update_stack(|s| s.spec.template.gateway.enabled = false);
    let result = pass(&store, &gates, 10).await;
    assert_eq!(result.pruned, 3);
    assert!(store
        .object(ObjectKind::Deployment, "tempo-simplest-gateway")
        .is_none());
    assert!(store
        .object(ObjectKind::Service, "tempo-simplest-gateway")
        .is_none());
    assert!(store
        .object(ObjectKind::Service, "tempo-simplest-distributor-discovery")
        .is_none());
}

#[tokio::test]
async fn test_config_change_rolls_pods() {
    let store = seeded(valid_storage_secret());
    let gates = FeatureGates::default();

    pass(&store, &gates, 0).await;
    let hash = |store: &MemoryStore| match store.object(ObjectKind::Deployment, "tempo-simplest-querier") {
        Some(DesiredObject::Deployment(d)) => d
            .spec
            .and_then(|s| s.template.metadata)
            .and_then(|m| m.annotations)
            .and_then(|a| a.get("tempo.grafana.com/config.hash").cloned())
            .expect("config hash annotation"),
        other => panic!("unexpected object: {other:?}"),
    };
    let before = hash(&store);

    store.update_stack(|s| s.spec.replication_factor = 3);
    pass(&store, &gates, 10).await;
    let after = hash(&store);
    assert_ne!(before, after);
}
