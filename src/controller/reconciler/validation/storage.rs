//! # Storage Secret Validation
//!
//! Extracts the object storage credential bundle from a Secret and validates it.
//! Every check runs; errors accumulate in check order.

use k8s_openapi::api::core::v1::Secret;
use regex::Regex;
use std::sync::LazyLock;

pub const KEY_ENDPOINT: &str = "endpoint";
pub const KEY_BUCKET: &str = "bucket";
pub const KEY_ACCESS_KEY_ID: &str = "access_key_id";
pub const KEY_ACCESS_KEY_SECRET: &str = "access_key_secret";

/// Absolute URL: scheme, "://", and a non-empty authority
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/?#]+(?:[/?#]\S*)?$")
        .expect("Failed to compile URL regex - this should never happen")
});

/// Object storage credential bundle read from the storage secret
///
/// Fetched fresh on every reconcile. Empty values are treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageCredentials {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
}

impl StorageCredentials {
    /// Read the bundle from a Secret's `data` and `stringData`
    pub fn from_secret(secret: &Secret) -> Self {
        Self {
            endpoint: secret_value(secret, KEY_ENDPOINT),
            bucket: secret_value(secret, KEY_BUCKET),
            access_key_id: secret_value(secret, KEY_ACCESS_KEY_ID),
            access_key_secret: secret_value(secret, KEY_ACCESS_KEY_SECRET),
        }
    }

    /// Endpoint without its scheme, as tempo's S3 client expects it
    pub fn endpoint_host(&self) -> Option<&str> {
        let endpoint = self.endpoint.as_deref()?;
        let host = endpoint
            .split_once("://")
            .map_or(endpoint, |(_, rest)| rest);
        Some(host.trim_end_matches('/'))
    }

    /// Plain-HTTP endpoints disable TLS towards the object store
    pub fn insecure(&self) -> bool {
        self.endpoint
            .as_deref()
            .is_some_and(|e| e.to_lowercase().starts_with("http://"))
    }
}

fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    let from_string_data = secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .cloned();
    let value = from_string_data.or_else(|| {
        secret
            .data
            .as_ref()
            .and_then(|d| d.get(key))
            .map(|b| String::from_utf8_lossy(&b.0).into_owned())
    })?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Check whether a string is an absolute URL (scheme://host[...])
pub fn is_valid_url(url: &str) -> bool {
    URL_REGEX.is_match(url.trim())
}

/// Validate the credential bundle
///
/// Checks run in fixed order: endpoint, bucket, access_key_id, access_key_secret.
/// An empty result means the bundle is valid.
pub fn validate_storage_credentials(credentials: &StorageCredentials) -> Vec<String> {
    let mut errors = Vec::new();

    match credentials.endpoint.as_deref() {
        None => errors.push(missing_field(KEY_ENDPOINT)),
        Some(endpoint) if !is_valid_url(endpoint) => errors.push(format!(
            "\"{KEY_ENDPOINT}\" field of storage secret must be a valid URL"
        )),
        Some(_) => {}
    }

    if credentials.bucket.is_none() {
        errors.push(missing_field(KEY_BUCKET));
    }
    if credentials.access_key_id.is_none() {
        errors.push(missing_field(KEY_ACCESS_KEY_ID));
    }
    if credentials.access_key_secret.is_none() {
        errors.push(missing_field(KEY_ACCESS_KEY_SECRET));
    }

    errors
}

fn missing_field(key: &str) -> String {
    format!("storage secret must contain \"{key}\" field")
}

/// Degraded condition message for a failed validation
pub fn aggregate_storage_errors(errors: &[String]) -> String {
    format!("invalid storage secret: {}", errors.join(", "))
}
