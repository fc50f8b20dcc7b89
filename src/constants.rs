//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default minimum error backoff (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum error backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Field manager used for server-side apply and status patches
pub const DEFAULT_FIELD_MANAGER: &str = "tempo-controller";

// Built-in certificate management defaults (Kubernetes duration strings)
pub const DEFAULT_CA_CERT_VALIDITY: &str = "43830h";
pub const DEFAULT_CA_CERT_REFRESH: &str = "35064h";
pub const DEFAULT_CERT_VALIDITY: &str = "2160h";
pub const DEFAULT_CERT_REFRESH: &str = "1728h";

/// Default size of the ingester's persistent volume
pub const DEFAULT_STORAGE_SIZE: &str = "10Gi";

/// Default ingester ring replication factor
pub const DEFAULT_REPLICATION_FACTOR: i32 = 1;

// Label keys
pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_GOSSIP_MEMBER: &str = "tempo-gossip-member";

/// Value of `app.kubernetes.io/managed-by` on every owned object
pub const MANAGED_BY: &str = "tempo-controller";

/// Value of `app.kubernetes.io/name` on every owned object
pub const APP_NAME: &str = "tempo";

/// Pod template annotation carrying the rendered configuration checksum
pub const ANNOTATION_CONFIG_HASH: &str = "tempo.grafana.com/config.hash";

// Ports
pub const PORT_HTTP_SERVER: i32 = 3200;
pub const PORT_GRPC_SERVER: i32 = 9095;
pub const PORT_MEMBERLIST: i32 = 7946;
pub const PORT_OTLP_GRPC: i32 = 4317;
pub const PORT_OTLP_HTTP: i32 = 4318;
pub const PORT_JAEGER_THRIFT_HTTP: i32 = 14268;
pub const PORT_JAEGER_THRIFT_COMPACT: i32 = 6831;
pub const PORT_JAEGER_THRIFT_BINARY: i32 = 6832;
pub const PORT_JAEGER_GRPC: i32 = 14250;
pub const PORT_ZIPKIN: i32 = 9411;
pub const PORT_GATEWAY_HTTP: i32 = 8080;
pub const PORT_GATEWAY_GRPC: i32 = 8090;
pub const PORT_GATEWAY_INTERNAL: i32 = 8081;

// Port names
pub const PORT_NAME_HTTP: &str = "http";
pub const PORT_NAME_GRPC: &str = "grpc";
pub const PORT_NAME_MEMBERLIST: &str = "http-memberlist";
pub const PORT_NAME_OTLP_GRPC: &str = "otlp-grpc";
pub const PORT_NAME_OTLP_HTTP: &str = "otlp-http";
pub const PORT_NAME_JAEGER_THRIFT_HTTP: &str = "thrift-http";
pub const PORT_NAME_JAEGER_THRIFT_COMPACT: &str = "thrift-compact";
pub const PORT_NAME_JAEGER_THRIFT_BINARY: &str = "thrift-binary";
pub const PORT_NAME_JAEGER_GRPC: &str = "jaeger-grpc";
pub const PORT_NAME_ZIPKIN: &str = "http-zipkin";
pub const PORT_NAME_GATEWAY_HTTP: &str = "public";
pub const PORT_NAME_GATEWAY_GRPC: &str = "grpc-public";
pub const PORT_NAME_GATEWAY_INTERNAL: &str = "internal";

// Volumes and mount paths
pub const CONFIG_VOLUME_NAME: &str = "tempo-conf";
pub const CONFIG_MOUNT_PATH: &str = "/conf";
pub const TMP_VOLUME_NAME: &str = "tempo-tmp-storage";
pub const TMP_MOUNT_PATH: &str = "/var/tempo";
pub const DATA_VOLUME_NAME: &str = "data";
pub const RECEIVER_CA_MOUNT_PATH: &str = "/var/run/ca-receiver";
pub const RECEIVER_TLS_MOUNT_PATH: &str = "/var/run/tls/receiver";
pub const INTERNAL_CA_MOUNT_PATH: &str = "/var/run/ca";
pub const INTERNAL_TLS_MOUNT_ROOT: &str = "/var/run/tls/server";

/// Key of the CA bundle inside the CA bundle ConfigMap
pub const CA_BUNDLE_KEY: &str = "service-ca.crt";

/// Readiness endpoint served by every tempo component
pub const TEMPO_READINESS_PATH: &str = "/ready";

/// Message of the Ready condition after a successful reconcile
pub const READY_MESSAGE: &str = "All components are operational";
