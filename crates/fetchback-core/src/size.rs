use crate::error::Error;
use regex::Regex;
use std::sync::OnceLock;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)?)\s*(g|gb|m|mb|k|kb|b)?$").expect("size pattern is valid")
    })
}

/// Parse a human-friendly size such as `100MB`, `1.5GB`, `500kb` or `1048576`.
///
/// Fractional values are only accepted together with a unit; a bare number is a byte count.
pub fn parse_size(input: &str) -> Result<u64, Error> {
    let normalized = input.trim().to_lowercase();
    let invalid = || Error::InvalidSize(input.to_string());

    let captures = size_pattern().captures(&normalized).ok_or_else(invalid)?;
    let number = &captures[1];

    let multiplier = match captures.get(2).map(|m| m.as_str()) {
        Some("g") | Some("gb") => GIB,
        Some("m") | Some("mb") => MIB,
        Some("k") | Some("kb") => KIB,
        Some("b") | None => {
            return number.parse::<u64>().map_err(|_| invalid());
        }
        Some(_) => return Err(invalid()),
    };

    let value: f64 = number.parse().map_err(|_| invalid())?;
    Ok((value * multiplier as f64) as u64)
}

/// Render a byte count with one decimal place in the largest fitting unit.
pub fn format_size(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{}GB", one_decimal(bytes, GIB))
    } else if bytes >= MIB {
        format!("{}MB", one_decimal(bytes, MIB))
    } else if bytes >= KIB {
        format!("{}KB", one_decimal(bytes, KIB))
    } else {
        format!("{} bytes", bytes)
    }
}

/// One decimal place, with exact ties rounded up: 1.25 becomes 1.3, not 1.2.
fn one_decimal(bytes: u64, unit: u64) -> String {
    let scaled = (bytes as f64 / unit as f64 * 10.0).round() / 10.0;
    format!("{:.1}", scaled)
}
