//! Parser for Go-style duration strings (`"300ms"`, `"5m"`, `"1h30m"`).
//!
//! Settings fields like the user session timeout and the snapshot interval
//! are stored in this textual form and re-parsed whenever a dependent
//! subsystem needs the concrete [`Duration`].

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration string")]
    Empty,
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { input: String, unit: String },
}

/// Parse a duration string made of one or more `<number><unit>` segments.
///
/// Supported units: `ns`, `us`, `ms`, `s`, `m`, `h`. Fractional values are
/// accepted (`"1.5h"`). The bare string `"0"` is valid and means zero.
pub fn parse(input: &str) -> Result<Duration, DurationParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationParseError::Empty);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| DurationParseError::Invalid(input.to_string()))?;
        if number_len == 0 {
            return Err(DurationParseError::Invalid(input.to_string()));
        }

        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| DurationParseError::Invalid(input.to_string()))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            _ => {
                return Err(DurationParseError::UnknownUnit {
                    input: input.to_string(),
                    unit: unit.to_string(),
                })
            }
        };

        total_nanos += value * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos < 0.0 {
        return Err(DurationParseError::Invalid(input.to_string()));
    }

    Ok(Duration::from_nanos(total_nanos as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse("24h").unwrap(), Duration::from_secs(24 * 3600));
        assert_eq!(parse("10s").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn parses_compound_strings() {
        assert_eq!(parse("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse("2m30s").unwrap(), Duration::from_secs(150));
    }

    #[test]
    fn parses_fractional_values() {
        assert_eq!(parse("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse("0.5s").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn zero_without_unit_is_valid() {
        assert_eq!(parse("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("5").is_err());
        assert!(parse("m5").is_err());
        assert!(parse("5 minutes").is_err());
        assert!(parse("5x").is_err());
    }
}
