//! # Certificate Authority
//!
//! Self-signed signing CA and CA-signed leaf certificates for component mTLS.

use super::{CertificateError, PemPair, Result};
use rcgen::{
    string::Ia5String, BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
};
use std::time::Duration;
use time::OffsetDateTime;
use x509_parser::prelude::{FromDer, X509Certificate, X509Name};

/// Validity window and names of an issued certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// When the certificate becomes valid (Unix timestamp)
    pub not_before: i64,
    /// When the certificate expires (Unix timestamp)
    pub not_after: i64,
    pub common_name: String,
    pub issuer_common_name: String,
}

impl CertificateInfo {
    /// Parse certificate info from PEM-encoded certificate
    pub fn from_pem(pem_data: &str) -> Result<Self> {
        let der = parse_pem(pem_data)?;
        Self::from_der(&der)
    }

    /// Parse certificate info from DER-encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CertificateError::Parse(format!("failed to parse certificate: {e}")))?;

        Ok(Self {
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            common_name: first_common_name(cert.subject()),
            issuer_common_name: first_common_name(cert.issuer()),
        })
    }
}

fn first_common_name(name: &X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Parse PEM-encoded data and return the DER bytes of the first block
pub fn parse_pem(pem_data: &str) -> Result<Vec<u8>> {
    let pem_obj = ::pem::parse(pem_data.as_bytes())
        .map_err(|e| CertificateError::Parse(format!("failed to parse PEM: {e}")))?;
    Ok(pem_obj.contents().to_vec())
}

fn validity(now: OffsetDateTime, lifetime: Duration) -> Result<(OffsetDateTime, OffsetDateTime)> {
    let lifetime = ::time::Duration::try_from(lifetime)
        .map_err(|e| CertificateError::Generation(format!("invalid validity period: {e}")))?;
    Ok((now, now + lifetime))
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(common_name.to_string()),
    );
    dn
}

/// Create a new self-signed signing CA
pub fn issue_ca(common_name: &str, lifetime: Duration, now: OffsetDateTime) -> Result<PemPair> {
    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let (not_before, not_after) = validity(now, lifetime)?;
    params.not_before = not_before;
    params.not_after = not_after;

    let key_pair = KeyPair::generate()
        .map_err(|e| CertificateError::KeyGeneration(format!("failed to generate CA key: {e}")))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CertificateError::Generation(format!("failed to create CA cert: {e}")))?;

    Ok(PemPair {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
    })
}

/// Issue a leaf certificate signed by `ca`, valid for both server and client auth
pub fn issue_leaf(
    ca: &PemPair,
    common_name: &str,
    dns_names: &[String],
    lifetime: Duration,
    now: OffsetDateTime,
) -> Result<PemPair> {
    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];
    let (not_before, not_after) = validity(now, lifetime)?;
    params.not_before = not_before;
    params.not_after = not_after;
    params.subject_alt_names = dns_names
        .iter()
        .map(|name| {
            Ia5String::try_from(name.clone())
                .map(SanType::DnsName)
                .map_err(|e| {
                    CertificateError::Generation(format!("invalid DNS name '{name}': {e}"))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let leaf_key = KeyPair::generate()
        .map_err(|e| CertificateError::KeyGeneration(format!("failed to generate leaf key: {e}")))?;

    let ca_key = KeyPair::from_pem(&ca.key_pem)
        .map_err(|e| CertificateError::Parse(format!("failed to load CA key: {e}")))?;
    let issuer = Issuer::from_ca_cert_pem(&ca.cert_pem, &ca_key)
        .map_err(|e| CertificateError::Parse(format!("failed to create issuer: {e}")))?;

    let cert = params
        .signed_by(&leaf_key, &issuer)
        .map_err(|e| CertificateError::Generation(format!("failed to sign leaf cert: {e}")))?;

    Ok(PemPair {
        cert_pem: cert.pem(),
        key_pem: leaf_key.serialize_pem(),
    })
}

/// Whether a stored CA pair can still be used for signing
pub fn is_usable_ca(ca: &PemPair) -> bool {
    KeyPair::from_pem(&ca.key_pem).is_ok() && CertificateInfo::from_pem(&ca.cert_pem).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_ca_is_self_signed() {
        let now = OffsetDateTime::now_utc();
        let ca = issue_ca("tempo-test-signing-ca@1", Duration::from_secs(3600), now).unwrap();
        let info = CertificateInfo::from_pem(&ca.cert_pem).unwrap();
        assert_eq!(info.common_name, "tempo-test-signing-ca@1");
        assert_eq!(info.issuer_common_name, info.common_name);
        assert_eq!(info.not_after - info.not_before, 3600);
        assert!(is_usable_ca(&ca));
    }

    #[test]
    fn test_issue_leaf_is_signed_by_ca() {
        let now = OffsetDateTime::now_utc();
        let ca = issue_ca("ca@1", Duration::from_secs(7200), now).unwrap();
        let leaf = issue_leaf(
            &ca,
            "tempo-test-ingester",
            &["tempo-test-ingester".to_string()],
            Duration::from_secs(600),
            now,
        )
        .unwrap();
        let info = CertificateInfo::from_pem(&leaf.cert_pem).unwrap();
        assert_eq!(info.common_name, "tempo-test-ingester");
        assert_eq!(info.issuer_common_name, "ca@1");
    }

    #[test]
    fn test_validity_window_starts_now() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let ca = issue_ca("ca@1", Duration::from_secs(86_400), now).unwrap();
        let info = CertificateInfo::from_pem(&ca.cert_pem).unwrap();
        assert_eq!(info.not_before, 1_700_000_000);
        assert_eq!(info.not_after, 1_700_086_400);
    }

    #[test]
    fn test_garbage_ca_is_not_usable() {
        let ca = PemPair {
            cert_pem: "not a cert".to_string(),
            key_pem: "not a key".to_string(),
        };
        assert!(!is_usable_ca(&ca));
    }
}
