//! # Component Builders
//!
//! One builder per component. Each returns its workload first, then the
//! services selecting it.

mod compactor;
mod distributor;
mod gateway;
mod ingester;
mod querier;
mod query_frontend;

use super::naming::{component_labels, Component};
use super::ports::{service_ports, PortSpec};
use super::resources::ResourceBudget;
use super::{object_meta, DesiredObject, ManifestParams, SynthesisError};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{PodTemplateSpec, Service, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

/// Inputs shared by every component builder within one synthesis pass
#[derive(Debug)]
pub struct BuildContext<'a> {
    pub params: &'a ManifestParams<'a>,
    pub instance: &'a str,
    pub namespace: &'a str,
    pub config_checksum: &'a str,
    pub budget: Option<ResourceBudget>,
    pub gateway_enabled: bool,
}

/// Workload and services of one component
pub fn build(ctx: &BuildContext<'_>, component: Component) -> Result<Vec<DesiredObject>, SynthesisError> {
    match component {
        Component::Distributor => Ok(distributor::build(ctx)),
        Component::Ingester => ingester::build(ctx),
        Component::Compactor => Ok(compactor::build(ctx)),
        Component::Querier => Ok(querier::build(ctx)),
        Component::QueryFrontend => Ok(query_frontend::build(ctx)),
        Component::Gateway => gateway::build(ctx),
    }
}

pub(super) fn replicas(replicas: Option<i32>) -> i32 {
    replicas.unwrap_or(1)
}

pub(super) fn deployment(
    ctx: &BuildContext<'_>,
    component: Component,
    name: String,
    replicas: i32,
    template: PodTemplateSpec,
) -> Deployment {
    Deployment {
        metadata: object_meta(name, component_labels(component, ctx.instance)),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(component_labels(component, ctx.instance)),
                ..Default::default()
            },
            template,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// ClusterIP service selecting a component's pods
pub(super) fn service(
    ctx: &BuildContext<'_>,
    component: Component,
    name: String,
    ports: &[PortSpec],
) -> Service {
    Service {
        metadata: object_meta(name, component_labels(component, ctx.instance)),
        spec: Some(ServiceSpec {
            selector: Some(component_labels(component, ctx.instance)),
            ports: Some(service_ports(ports)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Headless service publishing pod addresses before they are ready
pub(super) fn headless_service(
    name: String,
    labels: BTreeMap<String, String>,
    selector: BTreeMap<String, String>,
    ports: &[PortSpec],
) -> Service {
    Service {
        metadata: object_meta(name, labels),
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            publish_not_ready_addresses: Some(true),
            selector: Some(selector),
            ports: (!ports.is_empty()).then(|| service_ports(ports)),
            ..Default::default()
        }),
        ..Default::default()
    }
}
