//! Gateway: public ingestion and query entry point in front of the
//! distributor and query-frontend.

use super::{deployment, replicas, service, BuildContext};
use crate::constants::{
    PORT_HTTP_SERVER, PORT_NAME_GATEWAY_INTERNAL, PORT_OTLP_GRPC, TEMPO_READINESS_PATH,
};
use crate::manifests::naming::{
    distributor_discovery_name, resource_name, service_fqdn, Component,
};
use crate::manifests::pod::{pod_template, readiness_probe, security_context};
use crate::manifests::ports::{
    component_ports, container_ports, GATEWAY_GRPC, GATEWAY_HTTP, GATEWAY_INTERNAL,
};
use crate::manifests::resources::component_resources;
use crate::manifests::{DesiredObject, SynthesisError};
use k8s_openapi::api::core::v1::Container;

const GATEWAY_CONTAINER_NAME: &str = "tempo-gateway";

pub(super) fn build(ctx: &BuildContext<'_>) -> Result<Vec<DesiredObject>, SynthesisError> {
    let component = Component::Gateway;
    let spec = &ctx.params.tempo.spec;
    let template = &spec.template.gateway;
    let ports = component_ports(component, ctx.gateway_enabled);
    let name = resource_name(component, ctx.instance);

    let image = spec
        .images
        .tempo_gateway
        .clone()
        .filter(|image| !image.is_empty())
        .ok_or(SynthesisError::MissingGatewayImage)?;

    let distributor = service_fqdn(&distributor_discovery_name(ctx.instance), ctx.namespace);
    let query_frontend = service_fqdn(
        &resource_name(Component::QueryFrontend, ctx.instance),
        ctx.namespace,
    );

    let args = vec![
        format!("--web.listen=0.0.0.0:{}", GATEWAY_HTTP.port),
        format!("--web.internal.listen=0.0.0.0:{}", GATEWAY_INTERNAL.port),
        format!("--grpc.listen=0.0.0.0:{}", GATEWAY_GRPC.port),
        format!("--traces.write.endpoint={distributor}:{PORT_OTLP_GRPC}"),
        format!("--traces.tempo.endpoint=http://{query_frontend}:{PORT_HTTP_SERVER}"),
        format!("--log.level={}", spec.log_level),
    ];

    let container = Container {
        name: GATEWAY_CONTAINER_NAME.to_string(),
        image: Some(image),
        args: Some(args),
        ports: Some(container_ports(&ports.container)),
        readiness_probe: Some(readiness_probe(
            PORT_NAME_GATEWAY_INTERNAL,
            TEMPO_READINESS_PATH,
            false,
        )),
        resources: Some(component_resources(
            ctx.budget.as_ref(),
            component,
            ctx.gateway_enabled,
        )),
        security_context: Some(security_context()),
        ..Default::default()
    };
    let pod = pod_template(ctx, component, &template.component, container, Vec::new());

    Ok(vec![
        DesiredObject::Deployment(deployment(
            ctx,
            component,
            name.clone(),
            replicas(template.component.replicas),
            pod,
        )),
        DesiredObject::Service(service(ctx, component, name, &ports.service)),
    ])
}
