//! # Certificate Manager Tests
//!
//! Issuance, reuse and rotation of the built-in CA and leaf certificates.

mod common;

use common::*;
use std::time::Duration;
use tempo_controller::certificates::{
    ensure_certificates, leaf_dns_names, CertificateBundle, CertificateInfo, CertificatePolicy,
    CertificateTarget, ExistingCertificates,
};
use tempo_controller::manifests::naming::{Channel, Component, TEMPO_COMPONENTS};
use time::OffsetDateTime;

const HOUR: u64 = 3600;
const BASE: i64 = 1_700_000_000;

fn policy() -> CertificatePolicy {
    CertificatePolicy {
        ca_validity: Duration::from_secs(100 * HOUR),
        ca_refresh: Duration::from_secs(80 * HOUR),
        cert_validity: Duration::from_secs(10 * HOUR),
        cert_refresh: Duration::from_secs(8 * HOUR),
        channels: vec![Channel::Grpc, Channel::Http],
    }
}

fn target() -> CertificateTarget<'static> {
    CertificateTarget {
        instance: INSTANCE,
        namespace: NAMESPACE,
        components: &TEMPO_COMPONENTS,
    }
}

fn at_hour(hours: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(BASE + hours * 3600).unwrap()
}

/// Material as it would be read back from the cluster
fn stored(bundle: &CertificateBundle) -> ExistingCertificates {
    ExistingCertificates {
        ca: Some(bundle.ca.clone()),
        ca_bundle: Some(bundle.ca_bundle.clone()),
        leaves: bundle
            .leaves
            .iter()
            .map(|l| (l.secret_name.clone(), l.pair.clone()))
            .collect(),
    }
}

/// DER contents of every block in a PEM bundle
fn blocks(bundle: &str) -> Vec<Vec<u8>> {
    pem::parse_many(bundle.as_bytes())
        .unwrap()
        .iter()
        .map(|b| b.contents().to_vec())
        .collect()
}

fn issue(existing: &ExistingCertificates, hours: i64) -> CertificateBundle {
    ensure_certificates(&policy(), &target(), existing, at_hour(hours)).unwrap()
}

#[test]
fn test_first_pass_issues_everything() {
    let bundle = issue(&ExistingCertificates::default(), 0);

    assert!(bundle.ca_rotated);
    assert_eq!(bundle.leaves_issued, 10);
    assert_eq!(bundle.ca_secret_name, "tempo-simplest-signing-ca");
    assert_eq!(bundle.ca_bundle_name, "tempo-simplest-ca-bundle");
    assert_eq!(blocks(&bundle.ca_bundle), blocks(&bundle.ca.cert_pem));

    let names: Vec<&str> = bundle.leaves.iter().map(|l| l.secret_name.as_str()).collect();
    assert_eq!(&names[..2], &["tempo-simplest-distributor-grpc", "tempo-simplest-distributor-http"]);
    assert_eq!(names[9], "tempo-simplest-query-frontend-http");
}

#[test]
fn test_leaves_are_signed_by_the_ca() {
    let bundle = issue(&ExistingCertificates::default(), 0);
    let ca = CertificateInfo::from_pem(&bundle.ca.cert_pem).unwrap();
    let leaf = bundle.leaf(Component::Ingester, Channel::Grpc).unwrap();
    let info = CertificateInfo::from_pem(&leaf.pair.cert_pem).unwrap();

    assert_eq!(info.issuer_common_name, ca.common_name);
    assert_eq!(info.common_name, "tempo-simplest-ingester");
    assert_eq!(info.not_after - info.not_before, 10 * 3600);
}

#[test]
fn test_fresh_material_is_reused() {
    let first = issue(&ExistingCertificates::default(), 0);
    let second = issue(&stored(&first), 1);

    assert!(!second.ca_rotated);
    assert_eq!(second.leaves_issued, 0);
    assert_eq!(second.ca, first.ca);
    assert_eq!(second.leaves, first.leaves);
    assert_eq!(second.ca_bundle, first.ca_bundle);
}

#[test]
fn test_leaf_past_refresh_is_reissued_under_same_ca() {
    let first = issue(&ExistingCertificates::default(), 0);
    let later = issue(&stored(&first), 9);

    assert!(!later.ca_rotated);
    assert_eq!(later.leaves_issued, 10);
    assert_eq!(later.ca, first.ca);
    assert_ne!(later.leaves, first.leaves);
}

#[test]
fn test_ca_rotation_keeps_previous_ca_trusted() {
    let first = issue(&ExistingCertificates::default(), 0);
    let rotated = issue(&stored(&first), 81);

    assert!(rotated.ca_rotated);
    assert_ne!(rotated.ca, first.ca);
    assert_eq!(rotated.leaves_issued, 10);
    let trusted = blocks(&rotated.ca_bundle);
    assert_eq!(trusted.len(), 2);
    assert_eq!(trusted[0], blocks(&rotated.ca.cert_pem)[0]);
    assert_eq!(trusted[1], blocks(&first.ca.cert_pem)[0]);
}

#[test]
fn test_expired_ca_drops_out_of_bundle() {
    let first = issue(&ExistingCertificates::default(), 0);
    let rotated = issue(&stored(&first), 81);
    let again = issue(&stored(&rotated), 101);

    assert!(!again.ca_rotated);
    assert_eq!(blocks(&again.ca_bundle), blocks(&rotated.ca.cert_pem));
}

#[test]
fn test_only_requested_channels_get_leaves() {
    let policy = CertificatePolicy {
        channels: vec![Channel::Grpc],
        ..policy()
    };
    let bundle =
        ensure_certificates(&policy, &target(), &ExistingCertificates::default(), at_hour(0))
            .unwrap();
    assert_eq!(bundle.leaves.len(), 5);
    assert!(bundle.leaf(Component::Querier, Channel::Http).is_none());
    assert_eq!(bundle.channels_for(Component::Querier), vec![Channel::Grpc]);
}

#[test]
fn test_policy_requires_gate_and_channel() {
    assert!(CertificatePolicy::from_feature_gates(&Default::default()).is_none());

    let mut gates = tls_gates();
    gates.http_encryption = false;
    let policy = CertificatePolicy::from_feature_gates(&gates).unwrap();
    assert_eq!(policy.channels, vec![Channel::Grpc]);
}

#[test]
fn test_query_frontend_names_cover_discovery_service() {
    let names = leaf_dns_names(Component::QueryFrontend, INSTANCE, NAMESPACE);
    assert!(names.contains(&"tempo-simplest-query-frontend".to_string()));
    assert!(names.contains(
        &"tempo-simplest-query-frontend-discovery.observability.svc.cluster.local".to_string()
    ));
    assert!(names.contains(
        &"*.tempo-simplest-query-frontend-discovery.observability.svc.cluster.local".to_string()
    ));
}
