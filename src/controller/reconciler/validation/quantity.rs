//! # Quantity Parsing
//!
//! Parses Kubernetes resource quantities ("500m", "2", "4Gi", "1.5G") into
//! integer millicores and bytes.

use anyhow::Result;
use regex::Regex;

struct ParsedQuantity {
    integer: u128,
    fraction: u128,
    fraction_digits: u32,
    suffix: String,
}

fn split_quantity(quantity: &str) -> Result<ParsedQuantity> {
    let trimmed = quantity.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("Quantity cannot be empty"));
    }

    let quantity_regex =
        Regex::new(r"^(?P<integer>\d+)(?:\.(?P<fraction>\d+))?(?P<suffix>[a-zA-Z]*)$")
            .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let captures = quantity_regex.captures(trimmed).ok_or_else(|| {
        anyhow::anyhow!("Invalid quantity '{trimmed}'. Expected format: <number><suffix> (e.g., '500m', '2Gi')")
    })?;

    let integer = captures["integer"]
        .parse::<u128>()
        .map_err(|e| anyhow::anyhow!("Invalid quantity '{trimmed}': {e}"))?;
    let (fraction, fraction_digits) = match captures.name("fraction") {
        Some(f) => {
            let digits = f.as_str();
            if digits.len() > 9 {
                return Err(anyhow::anyhow!(
                    "Invalid quantity '{trimmed}': too many fractional digits"
                ));
            }
            (
                digits
                    .parse::<u128>()
                    .map_err(|e| anyhow::anyhow!("Invalid quantity '{trimmed}': {e}"))?,
                digits.len() as u32,
            )
        }
        None => (0, 0),
    };

    Ok(ParsedQuantity {
        integer,
        fraction,
        fraction_digits,
        suffix: captures["suffix"].to_string(),
    })
}

/// Multiplier for a quantity suffix, as (numerator, denominator)
fn suffix_scale(suffix: &str) -> Option<(u128, u128)> {
    let scale = match suffix {
        "" => (1, 1),
        "m" => (1, 1000),
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        "Ki" => (1 << 10, 1),
        "Mi" => (1 << 20, 1),
        "Gi" => (1 << 30, 1),
        "Ti" => (1 << 40, 1),
        "Pi" => (1 << 50, 1),
        "Ei" => (1 << 60, 1),
        _ => return None,
    };
    Some(scale)
}

/// Scale a quantity into `unit_per_one` units (1000 for millicores, 1 for bytes), rounding down
fn scaled(quantity: &str, unit_per_one: u128) -> Result<u64> {
    let parsed = split_quantity(quantity)?;
    let (num, den) = suffix_scale(&parsed.suffix).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid quantity suffix '{}' in '{}'",
            parsed.suffix,
            quantity.trim()
        )
    })?;

    let fraction_den = 10u128.pow(parsed.fraction_digits);
    let mantissa = parsed.integer * fraction_den + parsed.fraction;
    let value = mantissa * num * unit_per_one / (den * fraction_den);

    u64::try_from(value).map_err(|_| anyhow::anyhow!("Quantity '{}' is too large", quantity.trim()))
}

/// Parse a CPU quantity into millicores ("1" => 1000, "250m" => 250)
pub fn parse_cpu_millis(quantity: &str) -> Result<u64> {
    scaled(quantity, 1000)
}

/// Parse a memory quantity into bytes ("1Ki" => 1024, "1k" => 1000)
pub fn parse_memory_bytes(quantity: &str) -> Result<u64> {
    scaled(quantity, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_quantities() {
        assert_eq!(parse_cpu_millis("1000m").unwrap(), 1000);
        assert_eq!(parse_cpu_millis("2").unwrap(), 2000);
        assert_eq!(parse_cpu_millis("0.5").unwrap(), 500);
        assert_eq!(parse_cpu_millis("1.25").unwrap(), 1250);
    }

    #[test]
    fn test_memory_quantities() {
        assert_eq!(parse_memory_bytes("2Gi").unwrap(), 2_147_483_648);
        assert_eq!(parse_memory_bytes("1G").unwrap(), 1_000_000_000);
        assert_eq!(parse_memory_bytes("512Mi").unwrap(), 536_870_912);
        assert_eq!(parse_memory_bytes("1.5Gi").unwrap(), 1_610_612_736);
        assert_eq!(parse_memory_bytes("1024").unwrap(), 1024);
    }

    #[test]
    fn test_invalid_quantities() {
        for q in ["", "abc", "1Xi", "-1", "1.2.3", "Gi"] {
            assert!(parse_memory_bytes(q).is_err(), "'{q}' should be rejected");
        }
    }
}
