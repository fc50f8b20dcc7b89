//! # Naming and Labels
//!
//! Deterministic object names and ownership labels. Every produced object is
//! named `tempo-<instance>-<component>[-<suffix>]`; nothing carries a random
//! suffix, so the same TempoStack always maps to the same object names.

use crate::constants::{
    APP_NAME, LABEL_COMPONENT, LABEL_GOSSIP_MEMBER, LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME,
    MANAGED_BY,
};
use std::collections::BTreeMap;
use std::fmt;

/// Logical component of a Tempo deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Distributor,
    Ingester,
    Compactor,
    Querier,
    QueryFrontend,
    Gateway,
}

/// Components running the tempo binary, in declaration order
pub const TEMPO_COMPONENTS: [Component; 5] = [
    Component::Distributor,
    Component::Ingester,
    Component::Compactor,
    Component::Querier,
    Component::QueryFrontend,
];

impl Component {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Distributor => "distributor",
            Component::Ingester => "ingester",
            Component::Compactor => "compactor",
            Component::Querier => "querier",
            Component::QueryFrontend => "query-frontend",
            Component::Gateway => "gateway",
        }
    }

    /// Whether pods of this component join the memberlist gossip ring
    #[must_use]
    pub fn joins_gossip_ring(&self) -> bool {
        matches!(
            self,
            Component::Distributor
                | Component::Ingester
                | Component::Compactor
                | Component::Querier
        )
    }

    /// Whether this component reads or writes the object store
    #[must_use]
    pub fn uses_object_storage(&self) -> bool {
        matches!(
            self,
            Component::Ingester
                | Component::Compactor
                | Component::Querier
                | Component::QueryFrontend
        )
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every component deployed for a stack, in declaration order
pub fn enabled_components(gateway_enabled: bool) -> Vec<Component> {
    let mut components = TEMPO_COMPONENTS.to_vec();
    if gateway_enabled {
        components.push(Component::Gateway);
    }
    components
}

/// Internal transport secured by the built-in certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Grpc,
    Http,
}

impl Channel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Grpc => "grpc",
            Channel::Http => "http",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `tempo-<instance>-<component>`
pub fn resource_name(component: Component, instance: &str) -> String {
    format!("{APP_NAME}-{instance}-{component}")
}

/// Name of the ConfigMap holding tempo.yaml and overrides.yaml
pub fn config_map_name(instance: &str) -> String {
    format!("{APP_NAME}-{instance}")
}

/// `tempo-<instance>-<component>-<channel>`
pub fn tls_secret_name(component: Component, channel: Channel, instance: &str) -> String {
    format!("{}-{channel}", resource_name(component, instance))
}

pub fn signing_ca_name(instance: &str) -> String {
    format!("{APP_NAME}-{instance}-signing-ca")
}

pub fn ca_bundle_name(instance: &str) -> String {
    format!("{APP_NAME}-{instance}-ca-bundle")
}

pub fn gossip_ring_name(instance: &str) -> String {
    format!("{APP_NAME}-{instance}-gossip-ring")
}

pub fn query_frontend_discovery_name(instance: &str) -> String {
    format!("{}-discovery", resource_name(Component::QueryFrontend, instance))
}

pub fn distributor_discovery_name(instance: &str) -> String {
    format!("{}-discovery", resource_name(Component::Distributor, instance))
}

/// Cluster-local DNS name of a service
pub fn service_fqdn(service: &str, namespace: &str) -> String {
    format!("{service}.{namespace}.svc.cluster.local")
}

/// Labels carried by every object owned by a stack
///
/// `app.kubernetes.io/instance` and `app.kubernetes.io/managed-by` form the
/// discovery contract used to list and prune owned objects.
pub fn common_labels(instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), instance.to_string()),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string()),
    ])
}

/// Labels selecting the pods of one component
pub fn component_labels(component: Component, instance: &str) -> BTreeMap<String, String> {
    let mut labels = common_labels(instance);
    labels.insert(LABEL_COMPONENT.to_string(), component.as_str().to_string());
    labels
}

/// Selector of the gossip ring service
pub fn gossip_selector(instance: &str) -> BTreeMap<String, String> {
    let mut labels = common_labels(instance);
    labels.insert(LABEL_GOSSIP_MEMBER.to_string(), "true".to_string());
    labels
}

/// Label selector string matching every object owned by a stack
pub fn discovery_selector(instance: &str) -> String {
    format!("{LABEL_INSTANCE}={instance},{LABEL_MANAGED_BY}={MANAGED_BY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(resource_name(Component::QueryFrontend, "simplest"), "tempo-simplest-query-frontend");
        assert_eq!(config_map_name("simplest"), "tempo-simplest");
        assert_eq!(
            tls_secret_name(Component::Ingester, Channel::Grpc, "simplest"),
            "tempo-simplest-ingester-grpc"
        );
        assert_eq!(signing_ca_name("simplest"), "tempo-simplest-signing-ca");
        assert_eq!(ca_bundle_name("simplest"), "tempo-simplest-ca-bundle");
    }

    #[test]
    fn test_component_labels_extend_common_labels() {
        let labels = component_labels(Component::Distributor, "simplest");
        assert_eq!(labels.get("app.kubernetes.io/instance").map(String::as_str), Some("simplest"));
        assert_eq!(
            labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("tempo-controller")
        );
        assert_eq!(labels.get("app.kubernetes.io/component").map(String::as_str), Some("distributor"));
    }

    #[test]
    fn test_gateway_is_last_when_enabled() {
        assert_eq!(enabled_components(false).len(), 5);
        assert_eq!(enabled_components(true).last(), Some(&Component::Gateway));
    }
}
