//! # TempoStack Spec
//!
//! Main CRD specification types and default values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TempoStack Custom Resource Definition
///
/// Describes one multi-component Tempo deployment: images, per-component
/// placement, the total resource envelope, tenant limits and retention, the
/// object storage secret and receiver TLS.
///
/// # Example
///
/// ```yaml
/// apiVersion: tempo.grafana.com/v1alpha1
/// kind: TempoStack
/// metadata:
///   name: simplest
///   namespace: observability
/// spec:
///   images:
///     tempo: docker.io/grafana/tempo:2.3.1
///   storage:
///     secret:
///       name: minio
///       type: s3
///   resources:
///     total:
///       cpu: 2000m
///       memory: 2Gi
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "TempoStack",
    group = "tempo.grafana.com",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::TempoStackStatus",
    shortname = "tempo",
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".status.tempoVersion"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TempoStackSpec {
    /// Container images for the managed components
    pub images: ImagesSpec,
    /// Service account used by every component pod
    #[serde(default)]
    pub service_account: Option<String>,
    /// Object storage backend
    pub storage: ObjectStorageSpec,
    /// Size of the ingester's persistent volume (Kubernetes quantity)
    /// Default: "10Gi"
    #[serde(default = "default_storage_size")]
    pub storage_size: String,
    /// Total resource envelope divided across all components
    #[serde(default)]
    pub resources: Resources,
    /// Ingester ring replication factor
    #[serde(default = "default_replication_factor")]
    pub replication_factor: i32,
    /// Global and per-tenant ingestion/query limits
    #[serde(default)]
    pub limits: LimitSpec,
    /// Global and per-tenant trace retention
    #[serde(default)]
    pub retention: RetentionSpec,
    /// Log level passed to every tempo component
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-component templates
    #[serde(default)]
    pub template: TempoTemplateSpec,
}

/// Container images
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImagesSpec {
    /// Tempo image, used by every tempo component
    pub tempo: String,
    /// Gateway image, only used when the gateway is enabled
    #[serde(default)]
    pub tempo_gateway: Option<String>,
}

/// Object storage configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageSpec {
    /// Reference to the secret holding the storage credentials
    pub secret: ObjectStorageSecretSpec,
}

/// Reference to a storage secret in the TempoStack's namespace
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageSecretSpec {
    /// Secret name
    pub name: String,
    /// Backend type
    #[serde(rename = "type")]
    pub backend: StorageBackendType,
}

/// Supported object storage backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendType {
    /// S3-compatible storage (AWS S3, MinIO, ...)
    #[default]
    S3,
}

impl StorageBackendType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackendType::S3 => "s3",
        }
    }
}

/// Resource envelope
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Total limits for the whole stack; unset means no limits are applied
    #[serde(default)]
    pub total: Option<ResourceEnvelope>,
}

/// CPU and memory quantities (Kubernetes quantity syntax, e.g. "2000m", "4Gi")
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEnvelope {
    pub cpu: String,
    pub memory: String,
}

/// Ingestion and query limits
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LimitSpec {
    /// Limits applied to every tenant without an override
    #[serde(default)]
    pub global: RateLimitSpec,
    /// Limits keyed by tenant id
    #[serde(default)]
    pub per_tenant: BTreeMap<String, RateLimitSpec>,
}

/// Limits for one tenant (or globally)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSpec {
    #[serde(default)]
    pub ingestion: IngestionLimitSpec,
    #[serde(default)]
    pub query: QueryLimitSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestionLimitSpec {
    #[serde(default)]
    pub ingestion_burst_size_bytes: Option<i64>,
    #[serde(default)]
    pub ingestion_rate_limit_bytes: Option<i64>,
    #[serde(default)]
    pub max_bytes_per_trace: Option<i64>,
    #[serde(default)]
    pub max_traces_per_user: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryLimitSpec {
    #[serde(default)]
    pub max_search_bytes_per_trace: Option<i64>,
}

/// Trace retention
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSpec {
    #[serde(default)]
    pub global: RetentionConfig,
    /// Retention keyed by tenant id
    #[serde(default)]
    pub per_tenant: BTreeMap<String, RetentionConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetentionConfig {
    /// How long traces are kept (duration string, e.g. "48h")
    #[serde(default)]
    pub traces: Option<String>,
}

/// Per-component templates
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TempoTemplateSpec {
    #[serde(default)]
    pub distributor: TempoDistributorSpec,
    #[serde(default)]
    pub ingester: TempoComponentSpec,
    #[serde(default)]
    pub compactor: TempoComponentSpec,
    #[serde(default)]
    pub querier: TempoComponentSpec,
    #[serde(default)]
    pub query_frontend: TempoComponentSpec,
    #[serde(default)]
    pub gateway: TempoGatewaySpec,
}

/// Placement and scale shared by every component
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TempoComponentSpec {
    /// Replica count; defaults to 1
    #[serde(default)]
    pub replicas: Option<i32>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
}

/// Distributor template
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TempoDistributorSpec {
    #[serde(flatten)]
    pub component: TempoComponentSpec,
    /// TLS for the trace receivers
    #[serde(default)]
    pub tls: ReceiversTlsSpec,
}

/// Gateway template
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TempoGatewaySpec {
    #[serde(flatten)]
    pub component: TempoComponentSpec,
    /// When enabled, the gateway owns the ingestion ports
    #[serde(default)]
    pub enabled: bool,
}

/// Receiver TLS configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiversTlsSpec {
    #[serde(default)]
    pub enabled: bool,
    /// Name of a ConfigMap holding the CA bundle used to verify clients
    #[serde(default)]
    pub ca: Option<String>,
    /// Name of a TLS secret holding the receiver certificate and key
    #[serde(default)]
    pub cert: Option<String>,
}

/// Pod toleration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub toleration_seconds: Option<i64>,
}

/// Default value for the ingester volume size
pub fn default_storage_size() -> String {
    crate::constants::DEFAULT_STORAGE_SIZE.to_string()
}

/// Default value for the replication factor
pub fn default_replication_factor() -> i32 {
    crate::constants::DEFAULT_REPLICATION_FACTOR
}

/// Default value for the component log level
pub fn default_log_level() -> String {
    "info".to_string()
}
