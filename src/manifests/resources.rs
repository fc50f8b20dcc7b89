//! # Resource Budgeting
//!
//! Divides the stack's total CPU and memory envelope across components.
//! Shares are expressed in per-mille and sum to 1000 for both layouts
//! (with and without the gateway). Requests are 30% of limits.
//!
//! Shares and products are single-precision floats truncated towards zero,
//! so a 2Gi envelope gives the distributor 257698032 bytes.
//! CPU is computed in millicores, memory in bytes.

use super::naming::Component;
use super::SynthesisError;
use crate::controller::reconciler::validation::{parse_cpu_millis, parse_memory_bytes};
use crate::crd::Resources;
use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// Request share of a limit
const REQUEST_RATIO: f32 = 0.3;

/// Parsed total envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBudget {
    pub cpu_millis: u64,
    pub memory_bytes: u64,
}

impl ResourceBudget {
    /// Parse `spec.resources.total`; `None` when no envelope is configured
    pub fn from_spec(resources: &Resources) -> Result<Option<Self>, SynthesisError> {
        let Some(total) = &resources.total else {
            return Ok(None);
        };
        let cpu_millis = parse_cpu_millis(&total.cpu).map_err(|e| SynthesisError::InvalidQuantity {
            field: "spec.resources.total.cpu".to_string(),
            message: e.to_string(),
        })?;
        let memory_bytes =
            parse_memory_bytes(&total.memory).map_err(|e| SynthesisError::InvalidQuantity {
                field: "spec.resources.total.memory".to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(Self {
            cpu_millis,
            memory_bytes,
        }))
    }
}

/// (cpu, memory) share of a component in per-mille
pub fn share(component: Component, gateway_enabled: bool) -> (u64, u64) {
    if gateway_enabled {
        match component {
            Component::Distributor => (260, 110),
            Component::Ingester => (360, 480),
            Component::Querier => (150, 140),
            Component::QueryFrontend => (80, 60),
            Component::Compactor => (90, 150),
            Component::Gateway => (60, 60),
        }
    } else {
        match component {
            Component::Distributor => (270, 120),
            Component::Ingester => (380, 500),
            Component::Querier => (160, 150),
            Component::QueryFrontend => (90, 70),
            Component::Compactor => (100, 160),
            Component::Gateway => (0, 0),
        }
    }
}

/// Limits and requests of one component
///
/// Without a budget the container gets empty requirements.
pub fn component_resources(
    budget: Option<&ResourceBudget>,
    component: Component,
    gateway_enabled: bool,
) -> ResourceRequirements {
    let Some(budget) = budget else {
        return ResourceRequirements::default();
    };
    let (cpu_share, memory_share) = share(component, gateway_enabled);

    let cpu_share = ratio(cpu_share);
    let memory_share = ratio(memory_share);

    let cpu_limit = scale(budget.cpu_millis, cpu_share);
    let memory_limit = scale(budget.memory_bytes, memory_share);
    let cpu_request = scale(budget.cpu_millis, cpu_share * REQUEST_RATIO);
    let memory_request = scale(budget.memory_bytes, memory_share * REQUEST_RATIO);

    ResourceRequirements {
        limits: Some(quantities(cpu_limit, memory_limit)),
        requests: Some(quantities(cpu_request, memory_request)),
        ..Default::default()
    }
}

fn ratio(per_mille: u64) -> f32 {
    per_mille as f32 / 1000.0
}

/// `total * share` in single precision, truncated
fn scale(total: u64, share: f32) -> u64 {
    (total as f32 * share) as u64
}

fn quantities(cpu_millis: u64, memory_bytes: u64) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(format!("{cpu_millis}m"))),
        ("memory".to_string(), Quantity(memory_bytes.to_string())),
    ])
}
