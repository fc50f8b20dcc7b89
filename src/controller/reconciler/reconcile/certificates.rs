//! Loads the certificate material already stored for a stack and runs the
//! certificate manager over it.

use crate::certificates::{
    ensure_certificates, CertificateBundle, CertificatePolicy, CertificateTarget,
    ExistingCertificates,
};
use crate::config::FeatureGates;
use crate::constants::CA_BUNDLE_KEY;
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::store::ClusterStore;
use crate::manifests::certificates::pem_pair_from_secret;
use crate::manifests::naming::{ca_bundle_name, signing_ca_name, tls_secret_name, TEMPO_COMPONENTS};
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use time::OffsetDateTime;
use tracing::info;

/// Issue or reuse certificates; `None` when internal TLS is disabled
pub(super) async fn resolve_certificates(
    store: &dyn ClusterStore,
    gates: &FeatureGates,
    namespace: &str,
    instance: &str,
    now: DateTime<Utc>,
) -> Result<Option<CertificateBundle>, ReconcilerError> {
    let Some(policy) = CertificatePolicy::from_feature_gates(gates) else {
        return Ok(None);
    };

    let existing = load_existing(store, &policy, namespace, instance).await?;
    let target = CertificateTarget {
        instance,
        namespace,
        components: &TEMPO_COMPONENTS,
    };
    let now = OffsetDateTime::from_unix_timestamp(now.timestamp())
        .unwrap_or_else(|_| OffsetDateTime::now_utc());
    let bundle = ensure_certificates(&policy, &target, &existing, now)?;

    if bundle.ca_rotated {
        metrics::increment_certificates_issued("ca", 1);
    }
    if bundle.leaves_issued > 0 {
        metrics::increment_certificates_issued("leaf", bundle.leaves_issued as u64);
        info!(
            resource.name = instance,
            resource.namespace = namespace,
            issued = bundle.leaves_issued,
            "Issued leaf certificates"
        );
    }
    Ok(Some(bundle))
}

async fn load_existing(
    store: &dyn ClusterStore,
    policy: &CertificatePolicy,
    namespace: &str,
    instance: &str,
) -> Result<ExistingCertificates, ReconcilerError> {
    let mut existing = ExistingCertificates {
        ca: store
            .get_secret(namespace, &signing_ca_name(instance))
            .await?
            .as_ref()
            .and_then(pem_pair_from_secret),
        ca_bundle: store
            .get_config_map(namespace, &ca_bundle_name(instance))
            .await?
            .and_then(|cm| cm.data)
            .and_then(|mut data| data.remove(CA_BUNDLE_KEY)),
        ..Default::default()
    };

    for component in TEMPO_COMPONENTS {
        for &channel in &policy.channels {
            let name = tls_secret_name(component, channel, instance);
            if let Some(pair) = store
                .get_secret(namespace, &name)
                .await?
                .as_ref()
                .and_then(pem_pair_from_secret)
            {
                existing.leaves.insert(name, pair);
            }
        }
    }
    Ok(existing)
}
