//! Distributor: trace receivers, or only control and gossip ports when the
//! gateway owns ingestion.

use super::{deployment, headless_service, replicas, service, BuildContext};
use crate::manifests::naming::{
    component_labels, distributor_discovery_name, resource_name, Component,
};
use crate::manifests::pod::{base_volumes, pod_template, tempo_container, ScratchStorage};
use crate::manifests::ports::component_ports;
use crate::manifests::tls::{internal_mounts, receiver_mounts};
use crate::manifests::DesiredObject;

pub(super) fn build(ctx: &BuildContext<'_>) -> Vec<DesiredObject> {
    let component = Component::Distributor;
    let template = &ctx.params.tempo.spec.template.distributor;
    let ports = component_ports(component, ctx.gateway_enabled);
    let name = resource_name(component, ctx.instance);

    let mut wiring = base_volumes(ctx.instance, ScratchStorage::EmptyDir);
    wiring.extend(receiver_mounts(&template.tls));
    wiring.extend(internal_mounts(ctx.params.certificates, component));

    let container = tempo_container(ctx, component, &ports.container, wiring.mounts);
    let pod = pod_template(ctx, component, &template.component, container, wiring.volumes);

    let mut objects = vec![
        DesiredObject::Deployment(deployment(
            ctx,
            component,
            name.clone(),
            replicas(template.component.replicas),
            pod,
        )),
        DesiredObject::Service(service(ctx, component, name, &ports.service)),
    ];

    // Portless: DNS resolves to pod IPs and the gateway dials OTLP gRPC on them
    if ctx.gateway_enabled {
        let labels = component_labels(component, ctx.instance);
        objects.push(DesiredObject::Service(headless_service(
            distributor_discovery_name(ctx.instance),
            labels.clone(),
            labels,
            &[],
        )));
    }
    objects
}
