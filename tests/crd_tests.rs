//! # CRD Tests
//!
//! Deserialization of sample TempoStack resources and the generated schema.

use kube::CustomResourceExt;
use tempo_controller::crd::{RetentionConfig, StorageBackendType, TempoStack};

#[test]
fn test_minimal_stack_gets_defaults() {
    let yaml = r#"
apiVersion: tempo.grafana.com/v1alpha1
kind: TempoStack
metadata:
  name: simplest
  namespace: observability
spec:
  images:
    tempo: docker.io/grafana/tempo:2.3.1
  storage:
    secret:
      name: minio
      type: s3
"#;

    let stack: TempoStack = serde_yaml::from_str(yaml).expect("Should deserialize minimal stack");

    assert_eq!(stack.spec.storage.secret.name, "minio");
    assert_eq!(stack.spec.storage.secret.backend, StorageBackendType::S3);
    assert_eq!(stack.spec.storage_size, "10Gi");
    assert_eq!(stack.spec.replication_factor, 1);
    assert_eq!(stack.spec.log_level, "info");
    assert!(stack.spec.resources.total.is_none());
    assert!(stack.spec.images.tempo_gateway.is_none());
    assert!(!stack.spec.template.gateway.enabled);
    assert!(!stack.spec.template.distributor.tls.enabled);
    assert!(stack.status.is_none());
}

#[test]
fn test_full_stack_deserializes() {
    let yaml = r#"
apiVersion: tempo.grafana.com/v1alpha1
kind: TempoStack
metadata:
  name: full
  namespace: observability
spec:
  images:
    tempo: docker.io/grafana/tempo:2.3.1
    tempoGateway: quay.io/observatorium/api:latest
  serviceAccount: tempo
  storage:
    secret:
      name: minio
      type: s3
  storageSize: 20Gi
  replicationFactor: 3
  logLevel: debug
  resources:
    total:
      cpu: 2000m
      memory: 2Gi
  limits:
    global:
      ingestion:
        ingestionRateLimitBytes: 15000000
        maxTracesPerUser: 10000
      query:
        maxSearchBytesPerTrace: 5000
    perTenant:
      team-a:
        ingestion:
          maxBytesPerTrace: 50000
  retention:
    global:
      traces: 72h
    perTenant:
      team-a:
        traces: 24h
  template:
    distributor:
      replicas: 2
      nodeSelector:
        kubernetes.io/os: linux
      tls:
        enabled: true
        ca: receiver-ca
        cert: receiver-cert
    ingester:
      tolerations:
        - key: dedicated
          operator: Equal
          value: tempo
          effect: NoSchedule
    gateway:
      enabled: true
      replicas: 1
"#;

    let stack: TempoStack = serde_yaml::from_str(yaml).expect("Should deserialize full stack");
    let spec = &stack.spec;

    assert_eq!(spec.service_account.as_deref(), Some("tempo"));
    assert_eq!(spec.storage_size, "20Gi");
    assert_eq!(spec.replication_factor, 3);
    assert_eq!(spec.log_level, "debug");

    let total = spec.resources.total.as_ref().expect("total envelope");
    assert_eq!(total.cpu, "2000m");
    assert_eq!(total.memory, "2Gi");

    assert_eq!(spec.limits.global.ingestion.ingestion_rate_limit_bytes, Some(15_000_000));
    assert_eq!(spec.limits.global.ingestion.max_traces_per_user, Some(10_000));
    assert_eq!(spec.limits.global.query.max_search_bytes_per_trace, Some(5000));
    assert_eq!(
        spec.limits.per_tenant["team-a"].ingestion.max_bytes_per_trace,
        Some(50_000)
    );

    assert_eq!(spec.retention.global.traces.as_deref(), Some("72h"));
    assert_eq!(
        spec.retention.per_tenant["team-a"],
        RetentionConfig {
            traces: Some("24h".to_string())
        }
    );

    let distributor = &spec.template.distributor;
    assert_eq!(distributor.component.replicas, Some(2));
    assert_eq!(distributor.component.node_selector["kubernetes.io/os"], "linux");
    assert!(distributor.tls.enabled);
    assert_eq!(distributor.tls.ca.as_deref(), Some("receiver-ca"));
    assert_eq!(distributor.tls.cert.as_deref(), Some("receiver-cert"));

    let toleration = &spec.template.ingester.tolerations[0];
    assert_eq!(toleration.key.as_deref(), Some("dedicated"));
    assert_eq!(toleration.effect.as_deref(), Some("NoSchedule"));

    assert!(spec.template.gateway.enabled);
    assert_eq!(spec.template.gateway.component.replicas, Some(1));
}

#[test]
fn test_unknown_backend_is_rejected() {
    let yaml = r#"
apiVersion: tempo.grafana.com/v1alpha1
kind: TempoStack
metadata:
  name: bad
spec:
  images:
    tempo: docker.io/grafana/tempo:2.3.1
  storage:
    secret:
      name: minio
      type: gcs
"#;
    assert!(serde_yaml::from_str::<TempoStack>(yaml).is_err());
}

#[test]
fn test_generated_crd_identity() {
    let crd = TempoStack::crd();
    assert_eq!(crd.metadata.name.as_deref(), Some("tempostacks.tempo.grafana.com"));
    assert_eq!(crd.spec.group, "tempo.grafana.com");
    assert_eq!(crd.spec.names.kind, "TempoStack");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    assert!(crd.spec.versions[0]
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());
}
