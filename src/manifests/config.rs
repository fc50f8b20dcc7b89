//! # Tempo Configuration
//!
//! Renders `tempo.yaml` and `overrides.yaml` into the stack's ConfigMap and
//! computes the checksum stamped on every pod template.
//!
//! The ConfigMap never carries credentials: the S3 keys are referenced as
//! `${S3_ACCESS_KEY}` / `${S3_SECRET_KEY}` and expanded by tempo from the
//! container environment.

use super::naming::{
    config_map_name, gossip_ring_name, query_frontend_discovery_name, resource_name,
    service_fqdn, Component,
};
use super::{ManifestParams, SynthesisError};
use crate::config::TlsProfile;
use crate::constants::*;
use crate::controller::reconciler::validation::{format_duration, parse_kubernetes_duration};
use crate::crd::{RateLimitSpec, RetentionConfig};
use k8s_openapi::api::core::v1::ConfigMap;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

pub const TEMPO_CONFIG_KEY: &str = "tempo.yaml";
pub const OVERRIDES_CONFIG_KEY: &str = "overrides.yaml";

/// Compactor retention when neither the stack nor a tenant sets one
const DEFAULT_RETENTION: &str = "48h";

/// Rendered configuration files and their checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    pub tempo_yaml: String,
    pub overrides_yaml: String,
    pub checksum: String,
}

impl RenderedConfig {
    pub fn config_map(&self, instance: &str) -> ConfigMap {
        ConfigMap {
            metadata: super::object_meta(
                config_map_name(instance),
                super::naming::common_labels(instance),
            ),
            data: Some(BTreeMap::from([
                (TEMPO_CONFIG_KEY.to_string(), self.tempo_yaml.clone()),
                (OVERRIDES_CONFIG_KEY.to_string(), self.overrides_yaml.clone()),
            ])),
            ..Default::default()
        }
    }
}

/// Render both configuration files
pub fn render(
    params: &ManifestParams<'_>,
    instance: &str,
    namespace: &str,
) -> Result<RenderedConfig, SynthesisError> {
    let tempo = tempo_config(params, instance, namespace)?;
    let overrides = overrides_config(params)?;

    let tempo_yaml = to_yaml(&tempo)?;
    let overrides_yaml = to_yaml(&overrides)?;

    let mut hasher = Sha256::new();
    hasher.update(tempo_yaml.as_bytes());
    hasher.update(overrides_yaml.as_bytes());
    let checksum = format!("{:x}", hasher.finalize());

    Ok(RenderedConfig {
        tempo_yaml,
        overrides_yaml,
        checksum,
    })
}

fn to_yaml(value: &Value) -> Result<String, SynthesisError> {
    serde_yaml::to_string(value).map_err(|e| SynthesisError::Render(e.to_string()))
}

fn tempo_config(
    params: &ManifestParams<'_>,
    instance: &str,
    namespace: &str,
) -> Result<Value, SynthesisError> {
    let spec = &params.tempo.spec;
    let gates = params.feature_gates;
    let profile = gates.tls_profile;
    let internal_tls = params.certificates.is_some();
    let grpc_tls = internal_tls && gates.grpc_encryption;
    let http_tls = internal_tls && gates.http_encryption;
    let gateway_enabled = spec.template.gateway.enabled;

    let mut server = json!({
        "http_listen_port": PORT_HTTP_SERVER,
        "grpc_server_max_recv_msg_size": 4_194_304,
        "grpc_server_max_send_msg_size": 4_194_304,
    });
    if grpc_tls {
        server["grpc_tls_config"] = server_tls(profile, "grpc", "RequireAndVerifyClientCert");
    }
    if http_tls {
        // Kubelet probes carry no client certificate
        server["http_tls_config"] = server_tls(profile, "http", "VerifyClientCertIfGiven");
    }

    let retention = spec
        .retention
        .global
        .traces
        .as_deref()
        .map(|r| retention_value(r, "spec.retention.global.traces"))
        .transpose()?
        .unwrap_or_else(|| DEFAULT_RETENTION.to_string());

    let mut frontend_worker = json!({
        "frontend_address": format!(
            "{}:{PORT_GRPC_SERVER}",
            query_frontend_discovery_name(instance)
        ),
    });
    let mut ingester_client = json!({});
    if grpc_tls {
        let qf_name = service_fqdn(&resource_name(Component::QueryFrontend, instance), namespace);
        let ingester_name = service_fqdn(&resource_name(Component::Ingester, instance), namespace);
        frontend_worker["grpc_client_config"] = client_tls(profile, &qf_name);
        ingester_client["grpc_client_config"] = client_tls(profile, &ingester_name);
    }

    let config = json!({
        "multitenancy_enabled": false,
        "usage_report": { "reporting_enabled": false },
        "server": server,
        "distributor": { "receivers": receivers(params, gateway_enabled) },
        "ingester": {
            "lifecycler": {
                "ring": { "replication_factor": spec.replication_factor },
            },
            "max_block_duration": "10m",
        },
        "ingester_client": ingester_client,
        "memberlist": {
            "abort_if_cluster_join_fails": false,
            "join_members": [gossip_ring_name(instance)],
        },
        "compactor": {
            "compaction": { "block_retention": retention },
            "ring": { "kvstore": { "store": "memberlist" } },
        },
        "querier": { "frontend_worker": frontend_worker },
        "storage": {
            "trace": {
                "backend": spec.storage.secret.backend.as_str(),
                "s3": {
                    "endpoint": params.credentials.endpoint_host().unwrap_or_default(),
                    "bucket": params.credentials.bucket.clone().unwrap_or_default(),
                    "insecure": params.credentials.insecure(),
                    "access_key": "${S3_ACCESS_KEY}",
                    "secret_key": "${S3_SECRET_KEY}",
                },
                "wal": { "path": format!("{TMP_MOUNT_PATH}/wal") },
                "local": { "path": format!("{TMP_MOUNT_PATH}/traces") },
            },
        },
        "query_frontend": { "search": { "concurrent_jobs": 2000 } },
        "overrides": global_overrides(&spec.limits.global),
    });
    Ok(config)
}

fn server_tls(profile: TlsProfile, channel: &str, client_auth: &str) -> Value {
    let dir = format!("{INTERNAL_TLS_MOUNT_ROOT}/{channel}");
    let mut tls = json!({
        "cert_file": format!("{dir}/tls.crt"),
        "key_file": format!("{dir}/tls.key"),
        "client_ca_file": format!("{INTERNAL_CA_MOUNT_PATH}/{CA_BUNDLE_KEY}"),
        "client_auth_type": client_auth,
        "tls_min_version": profile.min_version(),
    });
    if !profile.cipher_suites().is_empty() {
        tls["tls_cipher_suites"] = Value::String(profile.cipher_suites().join(","));
    }
    tls
}

fn client_tls(profile: TlsProfile, server_name: &str) -> Value {
    let dir = format!("{INTERNAL_TLS_MOUNT_ROOT}/grpc");
    let mut tls = json!({
        "tls_enabled": true,
        "tls_cert_path": format!("{dir}/tls.crt"),
        "tls_key_path": format!("{dir}/tls.key"),
        "tls_ca_path": format!("{INTERNAL_CA_MOUNT_PATH}/{CA_BUNDLE_KEY}"),
        "tls_server_name": server_name,
        "tls_min_version": profile.min_version(),
    });
    if !profile.cipher_suites().is_empty() {
        tls["tls_cipher_suites"] = Value::String(profile.cipher_suites().join(","));
    }
    tls
}

fn receivers(params: &ManifestParams<'_>, gateway_enabled: bool) -> Value {
    let receiver_tls = &params.tempo.spec.template.distributor.tls;
    let tls = receiver_tls.enabled.then(|| {
        json!({
            "cert_file": format!("{RECEIVER_TLS_MOUNT_PATH}/tls.crt"),
            "key_file": format!("{RECEIVER_TLS_MOUNT_PATH}/tls.key"),
            "client_ca_file": format!("{RECEIVER_CA_MOUNT_PATH}/{CA_BUNDLE_KEY}"),
            "min_version": params.feature_gates.tls_profile.receiver_min_version(),
        })
    });
    let endpoint = |port: i32| {
        let mut receiver = json!({ "endpoint": format!("0.0.0.0:{port}") });
        if let Some(tls) = &tls {
            receiver["tls"] = tls.clone();
        }
        receiver
    };

    // The gateway forwards OTLP over gRPC only
    if gateway_enabled {
        return json!({
            "otlp": { "protocols": { "grpc": endpoint(PORT_OTLP_GRPC) } },
        });
    }

    json!({
        "otlp": {
            "protocols": {
                "grpc": endpoint(PORT_OTLP_GRPC),
                "http": endpoint(PORT_OTLP_HTTP),
            },
        },
        "jaeger": {
            "protocols": {
                "thrift_http": endpoint(PORT_JAEGER_THRIFT_HTTP),
                "grpc": endpoint(PORT_JAEGER_GRPC),
                "thrift_binary": { "endpoint": format!("0.0.0.0:{PORT_JAEGER_THRIFT_BINARY}") },
                "thrift_compact": { "endpoint": format!("0.0.0.0:{PORT_JAEGER_THRIFT_COMPACT}") },
            },
        },
        "zipkin": endpoint(PORT_ZIPKIN),
    })
}

/// Limits shared by the global block and each tenant entry
fn limit_fields(limits: &RateLimitSpec, out: &mut Map<String, Value>) {
    let ingestion = &limits.ingestion;
    let fields = [
        ("ingestion_burst_size_bytes", ingestion.ingestion_burst_size_bytes),
        ("ingestion_rate_limit_bytes", ingestion.ingestion_rate_limit_bytes),
        ("max_bytes_per_trace", ingestion.max_bytes_per_trace),
        ("max_traces_per_user", ingestion.max_traces_per_user),
        ("max_search_bytes_per_trace", limits.query.max_search_bytes_per_trace),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            out.insert(key.to_string(), json!(value));
        }
    }
}

fn global_overrides(limits: &RateLimitSpec) -> Value {
    let mut out = Map::new();
    out.insert(
        "per_tenant_override_config".to_string(),
        json!(format!("{CONFIG_MOUNT_PATH}/{OVERRIDES_CONFIG_KEY}")),
    );
    limit_fields(limits, &mut out);
    Value::Object(out)
}

fn retention_value(raw: &str, field: &str) -> Result<String, SynthesisError> {
    parse_kubernetes_duration(raw)
        .map(format_duration)
        .map_err(|e| SynthesisError::InvalidDuration {
            field: field.to_string(),
            message: e.to_string(),
        })
}

/// Per-tenant overrides, keyed by tenant id in sorted order
fn overrides_config(params: &ManifestParams<'_>) -> Result<Value, SynthesisError> {
    let spec = &params.tempo.spec;
    let tenants: BTreeSet<&String> = spec
        .limits
        .per_tenant
        .keys()
        .chain(spec.retention.per_tenant.keys())
        .collect();

    let mut overrides = Map::new();
    for tenant in tenants {
        let mut entry = Map::new();
        if let Some(limits) = spec.limits.per_tenant.get(tenant) {
            limit_fields(limits, &mut entry);
        }
        if let Some(RetentionConfig {
            traces: Some(traces),
        }) = spec.retention.per_tenant.get(tenant)
        {
            let field = format!("spec.retention.perTenant.{tenant}.traces");
            entry.insert(
                "block_retention".to_string(),
                json!(retention_value(traces, &field)?),
            );
        }
        overrides.insert(tenant.clone(), Value::Object(entry));
    }
    Ok(json!({ "overrides": overrides }))
}
