//! # TLS Volume Wiring
//!
//! Volumes and mounts carrying TLS material into component pods. Receiver
//! TLS mounts user-supplied material on the distributor; internal TLS mounts
//! the built-in CA bundle and the component's per-channel leaf secrets.
//! Neither changes any port.

use super::naming::Component;
use crate::certificates::CertificateBundle;
use crate::constants::*;
use crate::crd::ReceiversTlsSpec;
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, SecretVolumeSource, Volume, VolumeMount,
};

/// Volumes and their mounts in matching order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsMounts {
    pub volumes: Vec<Volume>,
    pub mounts: Vec<VolumeMount>,
}

impl TlsMounts {
    fn push_config_map(&mut self, volume: &str, config_map: &str, path: &str) {
        self.volumes.push(Volume {
            name: volume.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map.to_string().into(),
                ..Default::default()
            }),
            ..Default::default()
        });
        self.mounts.push(read_only_mount(volume, path));
    }

    fn push_secret(&mut self, volume: &str, secret: &str, path: &str) {
        self.volumes.push(Volume {
            name: volume.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: secret.to_string().into(),
                ..Default::default()
            }),
            ..Default::default()
        });
        self.mounts.push(read_only_mount(volume, path));
    }

    pub fn extend(&mut self, other: TlsMounts) {
        self.volumes.extend(other.volumes);
        self.mounts.extend(other.mounts);
    }
}

pub fn read_only_mount(volume: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: path.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}

/// Receiver TLS material; volumes are named after the referenced objects
pub fn receiver_mounts(tls: &ReceiversTlsSpec) -> TlsMounts {
    let mut out = TlsMounts::default();
    if !tls.enabled {
        return out;
    }
    if let Some(ca) = tls.ca.as_deref().filter(|ca| !ca.is_empty()) {
        out.push_config_map(ca, ca, RECEIVER_CA_MOUNT_PATH);
    }
    if let Some(cert) = tls.cert.as_deref().filter(|c| !c.is_empty()) {
        out.push_secret(cert, cert, RECEIVER_TLS_MOUNT_PATH);
    }
    out
}

/// Built-in CA bundle plus one leaf secret per channel of the component
///
/// Components without leaves (the gateway) mount only the CA bundle.
pub fn internal_mounts(bundle: Option<&CertificateBundle>, component: Component) -> TlsMounts {
    let mut out = TlsMounts::default();
    let Some(bundle) = bundle else {
        return out;
    };
    out.push_config_map(
        &bundle.ca_bundle_name,
        &bundle.ca_bundle_name,
        INTERNAL_CA_MOUNT_PATH,
    );
    for channel in bundle.channels_for(component) {
        if let Some(leaf) = bundle.leaf(component, channel) {
            out.push_secret(
                &leaf.secret_name,
                &leaf.secret_name,
                &format!("{INTERNAL_TLS_MOUNT_ROOT}/{channel}"),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_tls_disabled_adds_nothing() {
        let tls = ReceiversTlsSpec {
            enabled: false,
            ca: Some("ca".to_string()),
            cert: Some("cert".to_string()),
        };
        assert_eq!(receiver_mounts(&tls), TlsMounts::default());
    }

    #[test]
    fn test_receiver_tls_mounts_ca_then_cert() {
        let tls = ReceiversTlsSpec {
            enabled: true,
            ca: Some("ca-custom".to_string()),
            cert: Some("cert-custom".to_string()),
        };
        let mounts = receiver_mounts(&tls);
        assert_eq!(mounts.volumes.len(), 2);
        assert_eq!(mounts.volumes[0].name, "ca-custom");
        let volume = serde_json::to_value(&mounts.volumes[0]).unwrap();
        assert_eq!(volume["configMap"]["name"], "ca-custom");
        assert_eq!(mounts.volumes[1].name, "cert-custom");
        assert_eq!(mounts.mounts[0].mount_path, RECEIVER_CA_MOUNT_PATH);
        assert_eq!(mounts.mounts[1].mount_path, RECEIVER_TLS_MOUNT_PATH);
        assert!(mounts.mounts.iter().all(|m| m.read_only == Some(true)));
    }

    #[test]
    fn test_no_bundle_no_internal_mounts() {
        assert_eq!(
            internal_mounts(None, Component::Ingester),
            TlsMounts::default()
        );
    }
}
