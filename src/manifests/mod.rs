//! # Manifest Synthesis
//!
//! Pure mapping from a TempoStack, its storage credentials and the issued
//! certificates to the ordered set of objects that should exist in the
//! cluster.
//!
//! ## Order
//!
//! 1. Tempo ConfigMap
//! 2. Certificate material (when internal TLS is enabled)
//! 3. Gossip ring service
//! 4. One block per component in declaration order, workload first
//!
//! The same inputs always produce the same objects in the same order.

pub mod certificates;
pub mod components;
pub mod config;
pub mod naming;
pub mod pod;
pub mod ports;
pub mod resources;
pub mod tls;

use crate::certificates::CertificateBundle;
use crate::config::FeatureGates;
use crate::controller::reconciler::validation::StorageCredentials;
use crate::crd::TempoStack;
use components::BuildContext;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use naming::{enabled_components, gossip_ring_name, gossip_selector};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Structural errors in a TempoStack spec
///
/// These are fatal for a reconcile pass and are surfaced like transport
/// errors, never written to status.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("invalid quantity in {field}: {message}")]
    InvalidQuantity { field: String, message: String },

    #[error("invalid duration in {field}: {message}")]
    InvalidDuration { field: String, message: String },

    #[error("gateway is enabled but spec.images.tempoGateway is not set")]
    MissingGatewayImage,

    #[error("TempoStack is missing metadata.{0}")]
    MissingMetadata(&'static str),

    #[error("failed to render tempo configuration: {0}")]
    Render(String),
}

/// Kind of a desired object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    ConfigMap,
    Secret,
    Service,
    Deployment,
    StatefulSet,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::ConfigMap,
        ObjectKind::Secret,
        ObjectKind::Service,
        ObjectKind::Deployment,
        ObjectKind::StatefulSet,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::ConfigMap => "ConfigMap",
            ObjectKind::Secret => "Secret",
            ObjectKind::Service => "Service",
            ObjectKind::Deployment => "Deployment",
            ObjectKind::StatefulSet => "StatefulSet",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workload descriptor, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredObject {
    ConfigMap(ConfigMap),
    Secret(Secret),
    Service(Service),
    Deployment(Deployment),
    StatefulSet(StatefulSet),
}

impl DesiredObject {
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            DesiredObject::ConfigMap(_) => ObjectKind::ConfigMap,
            DesiredObject::Secret(_) => ObjectKind::Secret,
            DesiredObject::Service(_) => ObjectKind::Service,
            DesiredObject::Deployment(_) => ObjectKind::Deployment,
            DesiredObject::StatefulSet(_) => ObjectKind::StatefulSet,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            DesiredObject::ConfigMap(o) => &o.metadata,
            DesiredObject::Secret(o) => &o.metadata,
            DesiredObject::Service(o) => &o.metadata,
            DesiredObject::Deployment(o) => &o.metadata,
            DesiredObject::StatefulSet(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            DesiredObject::ConfigMap(o) => &mut o.metadata,
            DesiredObject::Secret(o) => &mut o.metadata,
            DesiredObject::Service(o) => &mut o.metadata,
            DesiredObject::Deployment(o) => &mut o.metadata,
            DesiredObject::StatefulSet(o) => &mut o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata().labels.as_ref()
    }
}

/// Inputs of a synthesis pass
#[derive(Debug, Clone, Copy)]
pub struct ManifestParams<'a> {
    pub tempo: &'a TempoStack,
    pub credentials: &'a StorageCredentials,
    /// Issued certificates; `None` when internal TLS is disabled
    pub certificates: Option<&'a CertificateBundle>,
    pub feature_gates: &'a FeatureGates,
}

pub(crate) fn object_meta(name: String, labels: BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        labels: Some(labels),
        ..Default::default()
    }
}

/// Controller owner reference to the stack, when it has a UID
fn owner_reference(tempo: &TempoStack) -> Option<OwnerReference> {
    let uid = tempo.metadata.uid.clone()?;
    let name = tempo.metadata.name.clone()?;
    Some(OwnerReference {
        api_version: TempoStack::api_version(&()).to_string(),
        kind: TempoStack::kind(&()).to_string(),
        name,
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Produce every object a TempoStack needs
pub fn synthesize(params: &ManifestParams<'_>) -> Result<Vec<DesiredObject>, SynthesisError> {
    let instance = params
        .tempo
        .metadata
        .name
        .as_deref()
        .ok_or(SynthesisError::MissingMetadata("name"))?;
    let namespace = params
        .tempo
        .metadata
        .namespace
        .as_deref()
        .ok_or(SynthesisError::MissingMetadata("namespace"))?;
    let gateway_enabled = params.tempo.spec.template.gateway.enabled;

    let rendered = config::render(params, instance, namespace)?;
    let budget = resources::ResourceBudget::from_spec(&params.tempo.spec.resources)?;

    let mut objects = vec![DesiredObject::ConfigMap(rendered.config_map(instance))];

    if let Some(bundle) = params.certificates {
        objects.extend(certificates::certificate_objects(bundle, instance));
    }

    objects.push(DesiredObject::Service(components::headless_service(
        gossip_ring_name(instance),
        naming::common_labels(instance),
        gossip_selector(instance),
        &[ports::MEMBERLIST],
    )));

    let ctx = BuildContext {
        params,
        instance,
        namespace,
        config_checksum: &rendered.checksum,
        budget,
        gateway_enabled,
    };
    for component in enabled_components(gateway_enabled) {
        objects.extend(components::build(&ctx, component)?);
    }

    let owner = owner_reference(params.tempo);
    for object in &mut objects {
        let meta = object.metadata_mut();
        meta.namespace = Some(namespace.to_string());
        if let Some(owner) = &owner {
            meta.owner_references = Some(vec![owner.clone()]);
        }
    }

    Ok(objects)
}
