//! # Duration Validation
//!
//! Handles parsing and formatting Kubernetes duration strings.

use anyhow::Result;
use regex::Regex;
use std::time::Duration;

/// Parse Kubernetes duration string into std::time::Duration
/// Supports single and compound formats: "30s", "5m", "48h", "90d", "1h30m"
/// Returns Duration or error if format is invalid
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    // One or more <number><unit> segments, unit in s, m, h, d
    let full_regex = Regex::new(r"^(?:\d+[smhd])+$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;
    let segment_regex = Regex::new(r"(?P<number>\d+)(?P<unit>[smhd])")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let interval_lower = duration_trimmed.to_lowercase();

    if !full_regex.is_match(&interval_lower) {
        return Err(anyhow::anyhow!(
            "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '1m', '48h', '1h30m')",
            duration_trimmed
        ));
    }

    let mut total_seconds: u64 = 0;
    for captures in segment_regex.captures_iter(&interval_lower) {
        let number_str = &captures["number"];
        let number: u64 = number_str.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid duration number '{}' in '{}': {}",
                number_str,
                duration_trimmed,
                e
            )
        })?;

        let multiplier = match &captures["unit"] {
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            "d" => 86400,
            unit => {
                return Err(anyhow::anyhow!(
                    "Invalid unit '{}' in duration '{}'. Expected: s, m, h, or d",
                    unit,
                    duration_trimmed
                ));
            }
        };

        total_seconds = number
            .checked_mul(multiplier)
            .and_then(|s| total_seconds.checked_add(s))
            .ok_or_else(|| anyhow::anyhow!("Duration '{}' is too large", duration_trimmed))?;
    }

    if total_seconds == 0 {
        return Err(anyhow::anyhow!(
            "Duration must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    Ok(Duration::from_secs(total_seconds))
}

/// Format a duration using the largest unit that represents it exactly
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_duration() {
        assert_eq!(
            parse_kubernetes_duration("1h30m").unwrap(),
            Duration::from_secs(5400)
        );
    }

    #[test]
    fn test_certificate_defaults_parse() {
        assert_eq!(
            parse_kubernetes_duration("43830h").unwrap(),
            Duration::from_secs(43830 * 3600)
        );
    }

    #[test]
    fn test_format_round_trips_common_values() {
        assert_eq!(format_duration(Duration::from_secs(48 * 3600)), "48h");
        assert_eq!(format_duration(Duration::from_secs(90 * 60)), "90m");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
    }
}
