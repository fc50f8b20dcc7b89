//! Ingester: a StatefulSet with one persistent claim per replica.

use super::{replicas, service, BuildContext};
use crate::constants::DATA_VOLUME_NAME;
use crate::controller::reconciler::validation::parse_memory_bytes;
use crate::manifests::naming::{component_labels, resource_name, Component};
use crate::manifests::pod::{base_volumes, pod_template, tempo_container, ScratchStorage};
use crate::manifests::ports::component_ports;
use crate::manifests::tls::internal_mounts;
use crate::manifests::{object_meta, DesiredObject, SynthesisError};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

pub(super) fn build(ctx: &BuildContext<'_>) -> Result<Vec<DesiredObject>, SynthesisError> {
    let component = Component::Ingester;
    let spec = &ctx.params.tempo.spec;
    let template = &spec.template.ingester;
    let ports = component_ports(component, ctx.gateway_enabled);
    let name = resource_name(component, ctx.instance);

    parse_memory_bytes(&spec.storage_size).map_err(|e| SynthesisError::InvalidQuantity {
        field: "spec.storageSize".to_string(),
        message: e.to_string(),
    })?;

    let mut wiring = base_volumes(ctx.instance, ScratchStorage::Claim);
    wiring.extend(internal_mounts(ctx.params.certificates, component));

    let container = tempo_container(ctx, component, &ports.container, wiring.mounts);
    let pod = pod_template(ctx, component, template, container, wiring.volumes);

    let claim = PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(DATA_VOLUME_NAME.to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(spec.storage_size.clone()),
                )])),
                ..Default::default()
            }),
            volume_mode: Some("Filesystem".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let stateful_set = StatefulSet {
        metadata: object_meta(name.clone(), component_labels(component, ctx.instance)),
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas(template.replicas)),
            service_name: name.clone().into(),
            pod_management_policy: Some("Parallel".to_string()),
            selector: LabelSelector {
                match_labels: Some(component_labels(component, ctx.instance)),
                ..Default::default()
            },
            template: pod,
            volume_claim_templates: Some(vec![claim]),
            ..Default::default()
        }),
        ..Default::default()
    };

    Ok(vec![
        DesiredObject::StatefulSet(stateful_set),
        DesiredObject::Service(service(ctx, component, name, &ports.service)),
    ])
}
