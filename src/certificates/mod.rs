//! # Built-in Certificates
//!
//! Issues and rotates the signing CA and the per-component, per-channel leaf
//! certificates used for mutual TLS between Tempo components.
//!
//! ## Rotation
//!
//! - The CA is re-issued when missing, unreadable, or past its refresh threshold.
//! - A leaf is re-issued when missing, unreadable, past its own refresh
//!   threshold, or signed by a CA other than the current one.
//! - The trust bundle is additive: previous CAs stay trusted until they expire.

mod authority;
mod rotation;

pub use authority::{issue_ca, issue_leaf, parse_pem, CertificateInfo};
pub use rotation::{merge_ca_bundle, needs_refresh};

use crate::config::FeatureGates;
use crate::manifests::naming::{
    ca_bundle_name, distributor_discovery_name, query_frontend_discovery_name, resource_name,
    service_fqdn, signing_ca_name, tls_secret_name, Channel, Component,
};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Certificate errors
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("certificate generation failed: {0}")]
    Generation(String),

    #[error("certificate parsing error: {0}")]
    Parse(String),
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, CertificateError>;

/// PEM-encoded certificate and private key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemPair {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Validity and refresh windows plus the channels needing leaves
#[derive(Debug, Clone, PartialEq)]
pub struct CertificatePolicy {
    pub ca_validity: Duration,
    pub ca_refresh: Duration,
    pub cert_validity: Duration,
    pub cert_refresh: Duration,
    pub channels: Vec<Channel>,
}

impl CertificatePolicy {
    /// Policy derived from the feature gates; `None` when internal TLS is off
    pub fn from_feature_gates(gates: &FeatureGates) -> Option<Self> {
        if !gates.tls_enabled() {
            return None;
        }
        let mut channels = Vec::new();
        if gates.grpc_encryption {
            channels.push(Channel::Grpc);
        }
        if gates.http_encryption {
            channels.push(Channel::Http);
        }
        let certs = &gates.built_in_cert_management;
        Some(Self {
            ca_validity: certs.ca_cert_validity,
            ca_refresh: certs.ca_cert_refresh,
            cert_validity: certs.cert_validity,
            cert_refresh: certs.cert_refresh,
            channels,
        })
    }
}

/// Stack whose components need certificates
#[derive(Debug, Clone)]
pub struct CertificateTarget<'a> {
    pub instance: &'a str,
    pub namespace: &'a str,
    pub components: &'a [Component],
}

/// Certificate material currently stored in the cluster
#[derive(Debug, Clone, Default)]
pub struct ExistingCertificates {
    pub ca: Option<PemPair>,
    pub ca_bundle: Option<String>,
    /// Keyed by secret name
    pub leaves: BTreeMap<String, PemPair>,
}

/// Leaf certificate for one (component, channel)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCertificate {
    pub component: Component,
    pub channel: Channel,
    pub secret_name: String,
    pub pair: PemPair,
}

/// Full certificate set for a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub ca_secret_name: String,
    pub ca: PemPair,
    pub ca_bundle_name: String,
    pub ca_bundle: String,
    /// Ordered by component, then channel
    pub leaves: Vec<LeafCertificate>,
    /// Whether this pass issued a new CA
    pub ca_rotated: bool,
    /// Number of leaves issued this pass
    pub leaves_issued: usize,
}

impl CertificateBundle {
    /// Leaf for a component and channel, if one was issued
    pub fn leaf(&self, component: Component, channel: Channel) -> Option<&LeafCertificate> {
        self.leaves
            .iter()
            .find(|l| l.component == component && l.channel == channel)
    }

    /// Channels with a leaf for the given component
    pub fn channels_for(&self, component: Component) -> Vec<Channel> {
        self.leaves
            .iter()
            .filter(|l| l.component == component)
            .map(|l| l.channel)
            .collect()
    }
}

/// DNS names a component's leaf certificate is valid for
pub fn leaf_dns_names(component: Component, instance: &str, namespace: &str) -> Vec<String> {
    let mut services = vec![resource_name(component, instance)];
    match component {
        Component::QueryFrontend => services.push(query_frontend_discovery_name(instance)),
        Component::Distributor => services.push(distributor_discovery_name(instance)),
        _ => {}
    }

    let mut names = Vec::new();
    for service in services {
        let fqdn = service_fqdn(&service, namespace);
        names.push(service.clone());
        names.push(format!("{service}.{namespace}.svc"));
        names.push(format!("*.{fqdn}"));
        names.push(fqdn);
    }
    names
}

/// Ensure the CA and every required leaf are present and fresh
///
/// Reuses stored material where possible; issues only what is missing or due.
pub fn ensure_certificates(
    policy: &CertificatePolicy,
    target: &CertificateTarget<'_>,
    existing: &ExistingCertificates,
    now: OffsetDateTime,
) -> Result<CertificateBundle> {
    let now_unix = now.unix_timestamp();

    let reusable_ca = existing.ca.as_ref().filter(|ca| {
        authority::is_usable_ca(ca)
            && CertificateInfo::from_pem(&ca.cert_pem)
                .map(|info| !needs_refresh(&info, policy.ca_refresh, now_unix))
                .unwrap_or(false)
    });

    let (ca, ca_rotated) = match reusable_ca {
        Some(ca) => (ca.clone(), false),
        None => {
            let common_name = format!("{}@{now_unix}", signing_ca_name(target.instance));
            info!(
                resource.name = target.instance,
                resource.namespace = target.namespace,
                ca = common_name.as_str(),
                "Issuing signing CA"
            );
            (issue_ca(&common_name, policy.ca_validity, now)?, true)
        }
    };
    let ca_common_name = CertificateInfo::from_pem(&ca.cert_pem)?.common_name;

    let ca_bundle = merge_ca_bundle(&ca.cert_pem, existing.ca_bundle.as_deref(), now_unix)?;

    let mut leaves = Vec::new();
    let mut leaves_issued = 0;
    for &component in target.components {
        for &channel in &policy.channels {
            let secret_name = tls_secret_name(component, channel, target.instance);
            let current = existing.leaves.get(&secret_name).filter(|leaf| {
                CertificateInfo::from_pem(&leaf.cert_pem)
                    .map(|info| {
                        info.issuer_common_name == ca_common_name
                            && !needs_refresh(&info, policy.cert_refresh, now_unix)
                    })
                    .unwrap_or(false)
            });

            let pair = match current {
                Some(pair) => pair.clone(),
                None => {
                    debug!(
                        resource.name = target.instance,
                        secret = secret_name.as_str(),
                        "Issuing leaf certificate"
                    );
                    leaves_issued += 1;
                    issue_leaf(
                        &ca,
                        &resource_name(component, target.instance),
                        &leaf_dns_names(component, target.instance, target.namespace),
                        policy.cert_validity,
                        now,
                    )?
                }
            };

            leaves.push(LeafCertificate {
                component,
                channel,
                secret_name,
                pair,
            });
        }
    }

    Ok(CertificateBundle {
        ca_secret_name: signing_ca_name(target.instance),
        ca,
        ca_bundle_name: ca_bundle_name(target.instance),
        ca_bundle,
        leaves,
        ca_rotated,
        leaves_issued,
    })
}
