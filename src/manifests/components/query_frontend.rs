use super::{deployment, headless_service, replicas, service, BuildContext};
use crate::manifests::naming::{
    component_labels, query_frontend_discovery_name, resource_name, Component,
};
use crate::manifests::pod::{base_volumes, pod_template, tempo_container, ScratchStorage};
use crate::manifests::ports::component_ports;
use crate::manifests::tls::internal_mounts;
use crate::manifests::DesiredObject;

pub(super) fn build(ctx: &BuildContext<'_>) -> Vec<DesiredObject> {
    let component = Component::QueryFrontend;
    let template = &ctx.params.tempo.spec.template.query_frontend;
    let ports = component_ports(component, ctx.gateway_enabled);
    let name = resource_name(component, ctx.instance);

    let mut wiring = base_volumes(ctx.instance, ScratchStorage::EmptyDir);
    wiring.extend(internal_mounts(ctx.params.certificates, component));

    let container = tempo_container(ctx, component, &ports.container, wiring.mounts);
    let pod = pod_template(ctx, component, template, container, wiring.volumes);

    let labels = component_labels(component, ctx.instance);
    vec![
        DesiredObject::Deployment(deployment(
            ctx,
            component,
            name.clone(),
            replicas(template.replicas),
            pod,
        )),
        DesiredObject::Service(service(ctx, component, name, &ports.service)),
        // Querier workers connect to every frontend pod
        DesiredObject::Service(headless_service(
            query_frontend_discovery_name(ctx.instance),
            labels.clone(),
            labels,
            &ports.service,
        )),
    ]
}
