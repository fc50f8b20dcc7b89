//! # Rotation
//!
//! Refresh thresholds and the additive CA trust bundle.

use super::authority::CertificateInfo;
use super::{CertificateError, Result};
use pem::{EncodeConfig, LineEnding, Pem};
use std::time::Duration;

/// Whether a certificate must be re-issued at `now` (Unix seconds)
///
/// A certificate is refreshed once `refresh` has elapsed since it became valid,
/// or once it has expired, whichever comes first.
pub fn needs_refresh(info: &CertificateInfo, refresh: Duration, now: i64) -> bool {
    let refresh_secs = i64::try_from(refresh.as_secs()).unwrap_or(i64::MAX);
    let refresh_at = info.not_before.saturating_add(refresh_secs);
    now >= refresh_at || now >= info.not_after
}

/// Build the CA trust bundle
///
/// The current CA comes first, followed by every previously trusted CA that is
/// still inside its validity window. Leaves signed by a rotated-out CA keep
/// verifying until that CA expires.
pub fn merge_ca_bundle(current_ca_pem: &str, previous_bundle: Option<&str>, now: i64) -> Result<String> {
    let current = pem::parse(current_ca_pem.as_bytes())
        .map_err(|e| CertificateError::Parse(format!("failed to parse CA PEM: {e}")))?;

    let mut blocks: Vec<Pem> = vec![current];

    // An unreadable previous bundle only loses the old trust anchors
    let previous = previous_bundle
        .map(|bundle| pem::parse_many(bundle.as_bytes()).unwrap_or_default())
        .unwrap_or_default();

    for block in previous {
        if block.tag() != "CERTIFICATE" {
            continue;
        }
        if blocks.iter().any(|b| b.contents() == block.contents()) {
            continue;
        }
        let still_valid = CertificateInfo::from_der(block.contents())
            .map(|info| now < info.not_after)
            .unwrap_or(false);
        if still_valid {
            blocks.push(block);
        }
    }

    Ok(blocks
        .iter()
        .map(|b| pem::encode_config(b, EncodeConfig::new().set_line_ending(LineEnding::LF)))
        .collect::<String>())
}
