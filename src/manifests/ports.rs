//! # Port Wiring
//!
//! Named container ports per component and the matching service ports.
//! Every service port carries the container port's name and protocol and
//! targets it by name.

use super::naming::Component;
use crate::constants::*;
use k8s_openapi::api::core::v1::{ContainerPort, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// A named port exposed by a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub name: &'static str,
    pub port: i32,
    pub protocol: &'static str,
}

const fn tcp(name: &'static str, port: i32) -> PortSpec {
    PortSpec {
        name,
        port,
        protocol: "TCP",
    }
}

const fn udp(name: &'static str, port: i32) -> PortSpec {
    PortSpec {
        name,
        port,
        protocol: "UDP",
    }
}

pub const HTTP: PortSpec = tcp(PORT_NAME_HTTP, PORT_HTTP_SERVER);
pub const GRPC: PortSpec = tcp(PORT_NAME_GRPC, PORT_GRPC_SERVER);
pub const MEMBERLIST: PortSpec = tcp(PORT_NAME_MEMBERLIST, PORT_MEMBERLIST);
pub const OTLP_GRPC: PortSpec = tcp(PORT_NAME_OTLP_GRPC, PORT_OTLP_GRPC);
pub const OTLP_HTTP: PortSpec = tcp(PORT_NAME_OTLP_HTTP, PORT_OTLP_HTTP);
pub const JAEGER_THRIFT_HTTP: PortSpec = tcp(PORT_NAME_JAEGER_THRIFT_HTTP, PORT_JAEGER_THRIFT_HTTP);
pub const JAEGER_THRIFT_COMPACT: PortSpec =
    udp(PORT_NAME_JAEGER_THRIFT_COMPACT, PORT_JAEGER_THRIFT_COMPACT);
pub const JAEGER_THRIFT_BINARY: PortSpec =
    udp(PORT_NAME_JAEGER_THRIFT_BINARY, PORT_JAEGER_THRIFT_BINARY);
pub const JAEGER_GRPC: PortSpec = tcp(PORT_NAME_JAEGER_GRPC, PORT_JAEGER_GRPC);
pub const ZIPKIN: PortSpec = tcp(PORT_NAME_ZIPKIN, PORT_ZIPKIN);
pub const GATEWAY_HTTP: PortSpec = tcp(PORT_NAME_GATEWAY_HTTP, PORT_GATEWAY_HTTP);
pub const GATEWAY_GRPC: PortSpec = tcp(PORT_NAME_GATEWAY_GRPC, PORT_GATEWAY_GRPC);
pub const GATEWAY_INTERNAL: PortSpec = tcp(PORT_NAME_GATEWAY_INTERNAL, PORT_GATEWAY_INTERNAL);

/// Container and service ports of one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPorts {
    pub container: Vec<PortSpec>,
    pub service: Vec<PortSpec>,
}

/// Port layout of a component
///
/// With the gateway enabled the distributor keeps only its HTTP control and
/// gossip ports; ingestion belongs to the gateway.
pub fn component_ports(component: Component, gateway_enabled: bool) -> ComponentPorts {
    match component {
        Component::Distributor if gateway_enabled => ComponentPorts {
            container: vec![HTTP, MEMBERLIST],
            service: vec![HTTP, MEMBERLIST],
        },
        Component::Distributor => ComponentPorts {
            container: vec![
                OTLP_GRPC,
                HTTP,
                MEMBERLIST,
                OTLP_HTTP,
                JAEGER_THRIFT_HTTP,
                JAEGER_THRIFT_COMPACT,
                JAEGER_THRIFT_BINARY,
                JAEGER_GRPC,
                ZIPKIN,
            ],
            service: vec![
                OTLP_GRPC,
                HTTP,
                OTLP_HTTP,
                JAEGER_THRIFT_HTTP,
                JAEGER_THRIFT_COMPACT,
                JAEGER_THRIFT_BINARY,
                JAEGER_GRPC,
                ZIPKIN,
            ],
        },
        Component::Ingester => ComponentPorts {
            container: vec![HTTP, GRPC, MEMBERLIST],
            service: vec![HTTP, GRPC],
        },
        Component::Compactor => ComponentPorts {
            container: vec![HTTP, MEMBERLIST],
            service: vec![HTTP, MEMBERLIST],
        },
        Component::Querier => ComponentPorts {
            container: vec![HTTP, MEMBERLIST, GRPC],
            service: vec![HTTP, MEMBERLIST, GRPC],
        },
        Component::QueryFrontend => ComponentPorts {
            container: vec![HTTP, GRPC],
            service: vec![HTTP, GRPC],
        },
        Component::Gateway => ComponentPorts {
            container: vec![GATEWAY_HTTP, GATEWAY_GRPC, GATEWAY_INTERNAL],
            service: vec![GATEWAY_HTTP, GATEWAY_GRPC, GATEWAY_INTERNAL],
        },
    }
}

pub fn container_ports(ports: &[PortSpec]) -> Vec<ContainerPort> {
    ports
        .iter()
        .map(|p| ContainerPort {
            name: Some(p.name.to_string()),
            container_port: p.port,
            protocol: Some(p.protocol.to_string()),
            ..Default::default()
        })
        .collect()
}

pub fn service_ports(ports: &[PortSpec]) -> Vec<ServicePort> {
    ports
        .iter()
        .map(|p| ServicePort {
            name: Some(p.name.to_string()),
            port: p.port,
            protocol: Some(p.protocol.to_string()),
            target_port: Some(IntOrString::String(p.name.to_string())),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_ports_target_container_ports_by_name() {
        for component in super::super::naming::enabled_components(true) {
            for gateway in [false, true] {
                let ports = component_ports(component, gateway);
                for sp in service_ports(&ports.service) {
                    let name = sp.name.clone().unwrap_or_default();
                    assert_eq!(sp.target_port, Some(IntOrString::String(name.clone())));
                    assert!(
                        ports.container.iter().any(|c| c.name == name),
                        "{component}: service port {name} has no container port"
                    );
                }
            }
        }
    }

    #[test]
    fn test_jaeger_thrift_ports_are_udp() {
        let ports = component_ports(Component::Distributor, false);
        let udp: Vec<_> = ports
            .container
            .iter()
            .filter(|p| p.protocol == "UDP")
            .map(|p| p.name)
            .collect();
        assert_eq!(udp, vec!["thrift-compact", "thrift-binary"]);
    }
}
