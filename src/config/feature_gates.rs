//! # Feature Gates
//!
//! Operator-wide switches for built-in certificate management, internal
//! encryption and the TLS security profile.

use super::controller::{env_var_or_default_bool, env_var_or_default_str};
use crate::constants::{
    DEFAULT_CA_CERT_REFRESH, DEFAULT_CA_CERT_VALIDITY, DEFAULT_CERT_REFRESH,
    DEFAULT_CERT_VALIDITY,
};
use crate::controller::reconciler::validation::parse_kubernetes_duration;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

/// Operator feature gates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureGates {
    /// Built-in CA and leaf certificate issuance
    pub built_in_cert_management: BuiltInCertManagement,
    /// Encrypt component-to-component HTTP traffic
    pub http_encryption: bool,
    /// Encrypt component-to-component gRPC traffic
    pub grpc_encryption: bool,
    /// TLS security profile applied to every TLS listener
    pub tls_profile: TlsProfile,
}

/// Validity and refresh windows of the built-in certificate authority
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltInCertManagement {
    pub enabled: bool,
    pub ca_cert_validity: Duration,
    pub ca_cert_refresh: Duration,
    pub cert_validity: Duration,
    pub cert_refresh: Duration,
}

impl Default for BuiltInCertManagement {
    fn default() -> Self {
        // 43830h / 35064h / 2160h / 1728h
        Self {
            enabled: false,
            ca_cert_validity: Duration::from_secs(43830 * 3600),
            ca_cert_refresh: Duration::from_secs(35064 * 3600),
            cert_validity: Duration::from_secs(2160 * 3600),
            cert_refresh: Duration::from_secs(1728 * 3600),
        }
    }
}

impl FeatureGates {
    /// Load feature gates from environment variables
    ///
    /// Durations use the Kubernetes duration syntax (`43830h`, `90d`, `1h30m`).
    /// A malformed duration or a refresh window that is not shorter than its
    /// validity is an error, never silently defaulted.
    pub fn from_env() -> Result<Self> {
        let built_in_cert_management = BuiltInCertManagement {
            enabled: env_var_or_default_bool("BUILTIN_CERT_MANAGEMENT", false),
            ca_cert_validity: duration_from_env("CA_CERT_VALIDITY", DEFAULT_CA_CERT_VALIDITY)?,
            ca_cert_refresh: duration_from_env("CA_CERT_REFRESH", DEFAULT_CA_CERT_REFRESH)?,
            cert_validity: duration_from_env("CERT_VALIDITY", DEFAULT_CERT_VALIDITY)?,
            cert_refresh: duration_from_env("CERT_REFRESH", DEFAULT_CERT_REFRESH)?,
        };
        built_in_cert_management.validate()?;

        let tls_profile = env_var_or_default_str("TLS_PROFILE", TlsProfile::Intermediate.as_str())
            .parse::<TlsProfile>()?;

        Ok(Self {
            built_in_cert_management,
            http_encryption: env_var_or_default_bool("HTTP_ENCRYPTION", false),
            grpc_encryption: env_var_or_default_bool("GRPC_ENCRYPTION", false),
            tls_profile,
        })
    }

    /// Whether internal mTLS material must be issued and mounted
    #[must_use]
    pub fn tls_enabled(&self) -> bool {
        self.built_in_cert_management.enabled && (self.http_encryption || self.grpc_encryption)
    }
}

impl BuiltInCertManagement {
    fn validate(&self) -> Result<()> {
        if self.ca_cert_refresh >= self.ca_cert_validity {
            anyhow::bail!(
                "CA_CERT_REFRESH ({}s) must be shorter than CA_CERT_VALIDITY ({}s)",
                self.ca_cert_refresh.as_secs(),
                self.ca_cert_validity.as_secs()
            );
        }
        if self.cert_refresh >= self.cert_validity {
            anyhow::bail!(
                "CERT_REFRESH ({}s) must be shorter than CERT_VALIDITY ({}s)",
                self.cert_refresh.as_secs(),
                self.cert_validity.as_secs()
            );
        }
        Ok(())
    }
}

fn duration_from_env(key: &str, default: &str) -> Result<Duration> {
    let value = env_var_or_default_str(key, default);
    parse_kubernetes_duration(&value).with_context(|| format!("Invalid {key} '{value}'"))
}

/// TLS security profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsProfile {
    Old,
    #[default]
    Intermediate,
    Modern,
}

const MODERN_CIPHERS: &[&str] = &[
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
];

const LEGACY_CIPHERS: &[&str] = &[
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_CBC_SHA256",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_3DES_EDE_CBC_SHA",
];

impl TlsProfile {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsProfile::Old => "old",
            TlsProfile::Intermediate => "intermediate",
            TlsProfile::Modern => "modern",
        }
    }

    /// Minimum protocol version in tempo's configuration syntax
    #[must_use]
    pub fn min_version(&self) -> &'static str {
        match self {
            TlsProfile::Old => "VersionTLS10",
            TlsProfile::Intermediate => "VersionTLS12",
            TlsProfile::Modern => "VersionTLS13",
        }
    }

    /// Minimum protocol version in the trace receivers' syntax ("1.2")
    #[must_use]
    pub fn receiver_min_version(&self) -> &'static str {
        match self {
            TlsProfile::Old => "1.0",
            TlsProfile::Intermediate => "1.2",
            TlsProfile::Modern => "1.3",
        }
    }

    /// Allowed cipher suites; TLS 1.3 suites are not configurable, so modern is empty
    #[must_use]
    pub fn cipher_suites(&self) -> &'static [&'static str] {
        match self {
            TlsProfile::Old => LEGACY_CIPHERS,
            TlsProfile::Intermediate => MODERN_CIPHERS,
            TlsProfile::Modern => &[],
        }
    }
}

impl FromStr for TlsProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "old" => Ok(TlsProfile::Old),
            "intermediate" => Ok(TlsProfile::Intermediate),
            "modern" => Ok(TlsProfile::Modern),
            other => Err(anyhow::anyhow!(
                "Invalid TLS profile '{other}'. Expected: old, intermediate, or modern"
            )),
        }
    }
}
