//! Certificate material as cluster objects: the signing CA and leaf TLS
//! secrets, and the CA bundle ConfigMap.

use super::naming::common_labels;
use super::{object_meta, DesiredObject};
use crate::certificates::{CertificateBundle, PemPair};
use crate::constants::CA_BUNDLE_KEY;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use std::collections::BTreeMap;

pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_KEY_KEY: &str = "tls.key";
const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

fn tls_secret(name: &str, instance: &str, pair: &PemPair) -> Secret {
    Secret {
        metadata: object_meta(name.to_string(), common_labels(instance)),
        type_: Some(TLS_SECRET_TYPE.to_string()),
        string_data: Some(BTreeMap::from([
            (TLS_CERT_KEY.to_string(), pair.cert_pem.clone()),
            (TLS_KEY_KEY.to_string(), pair.key_pem.clone()),
        ])),
        ..Default::default()
    }
}

/// CA secret, CA bundle ConfigMap, then leaf secrets in bundle order
pub fn certificate_objects(bundle: &CertificateBundle, instance: &str) -> Vec<DesiredObject> {
    let mut objects = vec![
        DesiredObject::Secret(tls_secret(&bundle.ca_secret_name, instance, &bundle.ca)),
        DesiredObject::ConfigMap(ConfigMap {
            metadata: object_meta(bundle.ca_bundle_name.clone(), common_labels(instance)),
            data: Some(BTreeMap::from([(
                CA_BUNDLE_KEY.to_string(),
                bundle.ca_bundle.clone(),
            )])),
            ..Default::default()
        }),
    ];
    objects.extend(
        bundle
            .leaves
            .iter()
            .map(|leaf| DesiredObject::Secret(tls_secret(&leaf.secret_name, instance, &leaf.pair))),
    );
    objects
}

/// Read a TLS pair back from a stored secret
///
/// Accepts both `data` (as returned by the API server) and `stringData`.
pub fn pem_pair_from_secret(secret: &Secret) -> Option<PemPair> {
    let value = |key: &str| -> Option<String> {
        secret
            .string_data
            .as_ref()
            .and_then(|d| d.get(key).cloned())
            .or_else(|| {
                secret
                    .data
                    .as_ref()
                    .and_then(|d| d.get(key))
                    .and_then(|b| String::from_utf8(b.0.clone()).ok())
            })
    };
    Some(PemPair {
        cert_pem: value(TLS_CERT_KEY)?,
        key_pem: value(TLS_KEY_KEY)?,
    })
}
