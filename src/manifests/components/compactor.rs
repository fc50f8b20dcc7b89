use super::{deployment, replicas, service, BuildContext};
use crate::manifests::naming::{resource_name, Component};
use crate::manifests::pod::{base_volumes, pod_template, tempo_container, ScratchStorage};
use crate::manifests::ports::component_ports;
use crate::manifests::tls::internal_mounts;
use crate::manifests::DesiredObject;

pub(super) fn build(ctx: &BuildContext<'_>) -> Vec<DesiredObject> {
    let component = Component::Compactor;
    let template = &ctx.params.tempo.spec.template.compactor;
    let ports = component_ports(component, ctx.gateway_enabled);
    let name = resource_name(component, ctx.instance);

    let mut wiring = base_volumes(ctx.instance, ScratchStorage::EmptyDir);
    wiring.extend(internal_mounts(ctx.params.certificates, component));

    let container = tempo_container(ctx, component, &ports.container, wiring.mounts);
    let pod = pod_template(ctx, component, template, container, wiring.volumes);

    vec![
        DesiredObject::Deployment(deployment(
            ctx,
            component,
            name.clone(),
            replicas(template.replicas),
            pod,
        )),
        DesiredObject::Service(service(ctx, component, name, &ports.service)),
    ]
}
