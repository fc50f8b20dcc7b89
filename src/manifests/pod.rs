//! # Pod Templates
//!
//! Container and pod-template construction shared by every component:
//! config and scratch volumes, storage credential injection, readiness probe,
//! placement and the hardened security context.

use super::components::BuildContext;
use super::naming::{component_labels, config_map_name, Component};
use super::ports::{container_ports, PortSpec};
use super::resources::component_resources;
use super::tls::{read_only_mount, TlsMounts};
use crate::constants::*;
use crate::controller::reconciler::validation::{KEY_ACCESS_KEY_ID, KEY_ACCESS_KEY_SECRET};
use crate::crd::{TempoComponentSpec, Toleration};
use k8s_openapi::api::core::v1::{
    Affinity, Capabilities, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar,
    EnvVarSource, HTTPGetAction, PodAffinityTerm, PodAntiAffinity, PodSpec, PodTemplateSpec,
    Probe, SeccompProfile, SecretKeySelector, SecurityContext, Toleration as PodToleration,
    Volume, VolumeMount, WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

const TEMPO_CONTAINER_NAME: &str = "tempo";
const TEMPO_CONFIG_FILE: &str = "tempo.yaml";
const S3_ACCESS_KEY_ENV: &str = "S3_ACCESS_KEY";
const S3_SECRET_KEY_ENV: &str = "S3_SECRET_KEY";

/// Where a component keeps its scratch data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchStorage {
    /// emptyDir at the tmp path
    EmptyDir,
    /// Persistent claim template mounted at the tmp path
    Claim,
}

/// Config volume plus scratch storage, in mount order
pub fn base_volumes(instance: &str, scratch: ScratchStorage) -> TlsMounts {
    let mut volumes = vec![Volume {
        name: CONFIG_VOLUME_NAME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map_name(instance).into(),
            ..Default::default()
        }),
        ..Default::default()
    }];
    let mut mounts = vec![read_only_mount(CONFIG_VOLUME_NAME, CONFIG_MOUNT_PATH)];

    match scratch {
        ScratchStorage::EmptyDir => {
            volumes.push(Volume {
                name: TMP_VOLUME_NAME.to_string(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            });
            mounts.push(VolumeMount {
                name: TMP_VOLUME_NAME.to_string(),
                mount_path: TMP_MOUNT_PATH.to_string(),
                ..Default::default()
            });
        }
        ScratchStorage::Claim => {
            mounts.push(VolumeMount {
                name: DATA_VOLUME_NAME.to_string(),
                mount_path: TMP_MOUNT_PATH.to_string(),
                ..Default::default()
            });
        }
    }

    TlsMounts { volumes, mounts }
}

/// S3 credentials from the storage secret, for components touching the object store
pub fn storage_env(ctx: &BuildContext<'_>, component: Component) -> Vec<EnvVar> {
    if !component.uses_object_storage() {
        return Vec::new();
    }
    let secret = &ctx.params.tempo.spec.storage.secret.name;
    [
        (S3_ACCESS_KEY_ENV, KEY_ACCESS_KEY_ID),
        (S3_SECRET_KEY_ENV, KEY_ACCESS_KEY_SECRET),
    ]
    .into_iter()
    .map(|(name, key)| EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.clone().into(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
    .collect()
}

pub fn readiness_probe(port_name: &str, path: &str, https: bool) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::String(port_name.to_string()),
            scheme: Some(if https { "HTTPS" } else { "HTTP" }.to_string()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(15),
        timeout_seconds: Some(1),
        ..Default::default()
    }
}

pub fn security_context() -> SecurityContext {
    SecurityContext {
        allow_privilege_escalation: Some(false),
        capabilities: Some(Capabilities {
            drop: Some(vec!["ALL".to_string()]),
            ..Default::default()
        }),
        read_only_root_filesystem: Some(true),
        run_as_non_root: Some(true),
        seccomp_profile: Some(SeccompProfile {
            type_: "RuntimeDefault".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The `tempo` container running one component target
pub fn tempo_container(
    ctx: &BuildContext<'_>,
    component: Component,
    ports: &[PortSpec],
    mounts: Vec<VolumeMount>,
) -> Container {
    let spec = &ctx.params.tempo.spec;
    let env = storage_env(ctx, component);

    let mut args = vec![
        format!("-target={component}"),
        format!("-config.file={CONFIG_MOUNT_PATH}/{TEMPO_CONFIG_FILE}"),
        format!("-log.level={}", spec.log_level),
    ];
    if !env.is_empty() {
        args.push("-config.expand-env=true".to_string());
    }

    let https = ctx.params.certificates.is_some() && ctx.params.feature_gates.http_encryption;

    Container {
        name: TEMPO_CONTAINER_NAME.to_string(),
        image: Some(spec.images.tempo.clone()),
        args: Some(args),
        env: (!env.is_empty()).then_some(env),
        ports: Some(container_ports(ports)),
        readiness_probe: Some(readiness_probe(PORT_NAME_HTTP, TEMPO_READINESS_PATH, https)),
        resources: Some(component_resources(
            ctx.budget.as_ref(),
            component,
            ctx.gateway_enabled,
        )),
        security_context: Some(security_context()),
        volume_mounts: Some(mounts),
        ..Default::default()
    }
}

/// Prefer spreading replicas of a component across nodes
pub fn default_affinity(labels: &BTreeMap<String, String>) -> Affinity {
    Affinity {
        pod_anti_affinity: Some(PodAntiAffinity {
            preferred_during_scheduling_ignored_during_execution: Some(vec![
                WeightedPodAffinityTerm {
                    weight: 100,
                    pod_affinity_term: PodAffinityTerm {
                        label_selector: Some(LabelSelector {
                            match_labels: Some(labels.clone()),
                            ..Default::default()
                        }),
                        topology_key: "kubernetes.io/hostname".to_string(),
                        ..Default::default()
                    },
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_tolerations(tolerations: &[Toleration]) -> Option<Vec<PodToleration>> {
    if tolerations.is_empty() {
        return None;
    }
    Some(
        tolerations
            .iter()
            .map(|t| PodToleration {
                key: t.key.clone(),
                operator: t.operator.clone(),
                value: t.value.clone(),
                effect: t.effect.clone(),
                toleration_seconds: t.toleration_seconds,
            })
            .collect(),
    )
}

/// Labels on a component's pods; gossip members carry the ring label
pub fn pod_labels(component: Component, instance: &str) -> BTreeMap<String, String> {
    let mut labels = component_labels(component, instance);
    if component.joins_gossip_ring() {
        labels.insert(LABEL_GOSSIP_MEMBER.to_string(), "true".to_string());
    }
    labels
}

pub fn pod_template(
    ctx: &BuildContext<'_>,
    component: Component,
    placement: &TempoComponentSpec,
    container: Container,
    volumes: Vec<Volume>,
) -> PodTemplateSpec {
    let selector = component_labels(component, ctx.instance);
    let annotations = BTreeMap::from([(
        ANNOTATION_CONFIG_HASH.to_string(),
        ctx.config_checksum.to_string(),
    )]);

    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(pod_labels(component, ctx.instance)),
            annotations: Some(annotations),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            service_account_name: ctx.params.tempo.spec.service_account.clone(),
            node_selector: (!placement.node_selector.is_empty())
                .then(|| placement.node_selector.clone()),
            tolerations: pod_tolerations(&placement.tolerations),
            affinity: Some(default_affinity(&selector)),
            containers: vec![container],
            volumes: (!volumes.is_empty()).then_some(volumes),
            ..Default::default()
        }),
    }
}
