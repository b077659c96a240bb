//! Time literal parsing and unit conversion (`spec.md` §4.1, C1).
//!
//! Internal canonical unit is nanoseconds. Conversion is exact integer
//! multiplication; only the final division back to non-ns display units
//! needs rounding, which this module does not perform — callers stay in ns.

use crate::error::ConfigError;

/// A parsed time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Ns,
    Us,
    Ms,
    S,
}

impl TimeUnit {
    /// Multiplier to convert a value in this unit to nanoseconds.
    pub const fn ns_per_unit(self) -> i64 {
        match self {
            TimeUnit::Ns => 1,
            TimeUnit::Us => 1_000,
            TimeUnit::Ms => 1_000_000,
            TimeUnit::S => 1_000_000_000,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ns" => Some(TimeUnit::Ns),
            "us" | "µs" => Some(TimeUnit::Us),
            "ms" => Some(TimeUnit::Ms),
            "s" => Some(TimeUnit::S),
            _ => None,
        }
    }
}

/// Converts `value` in `unit` to nanoseconds. Non-integer nanoseconds round
/// half-to-even (banker's rounding), per `spec.md` §4.1.
pub fn to_ns(value: f64, unit: TimeUnit) -> i64 {
    round_half_to_even(value * unit.ns_per_unit() as f64)
}

fn round_half_to_even(x: f64) -> i64 {
    let floor = x.floor();
    let diff = x - floor;
    let floor_i = floor as i64;
    if diff < 0.5 {
        floor_i
    } else if diff > 0.5 {
        floor_i + 1
    } else if floor_i % 2 == 0 {
        floor_i
    } else {
        floor_i + 1
    }
}

/// Parses a literal of the form `<number> <unit>` (whitespace optional),
/// unit case-insensitive, unit ∈ {ns, us, ms, s}. `µs` is accepted spelled
/// as `us` on the wire (ASCII JSON), matching the Event Tensor/EIR formats.
pub fn parse_time(literal: &str) -> Result<i64, ConfigError> {
    let s = literal.trim();
    if s.is_empty() {
        return Err(ConfigError::BadTimeLiteral(literal.to_string()));
    }
    let lower = s.to_ascii_lowercase();
    let split_at = lower
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_digit() || *c == '.')
        .map(|(i, c)| i + c.len_utf8())
        .ok_or_else(|| ConfigError::BadTimeLiteral(literal.to_string()))?;
    let (num_part, unit_part) = lower.split_at(split_at);
    let unit = TimeUnit::from_token(unit_part.trim())
        .ok_or_else(|| ConfigError::BadTimeLiteral(literal.to_string()))?;
    let value: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| ConfigError::BadTimeLiteral(literal.to_string()))?;
    Ok(to_ns(value, unit))
}

/// Either a pre-resolved nanosecond count or a literal to parse.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Ns(i64),
    Literal(String),
}

impl TimeValue {
    pub fn to_ns(&self) -> Result<i64, ConfigError> {
        match self {
            TimeValue::Ns(n) => Ok(*n),
            TimeValue::Literal(s) => parse_time(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_time("5 ns").unwrap(), 5);
        assert_eq!(parse_time("5us").unwrap(), 5_000);
        assert_eq!(parse_time("2.5 ms").unwrap(), 2_500_000);
        assert_eq!(parse_time("1 s").unwrap(), 1_000_000_000);
    }

    #[test]
    fn case_insensitive_and_whitespace_tolerant() {
        assert_eq!(parse_time("10 MS").unwrap(), parse_time("10ms").unwrap());
        assert_eq!(parse_time("  10   ms  ").unwrap(), 10_000_000);
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_time("10 fortnights").is_err());
        assert!(parse_time("").is_err());
    }

    #[test]
    fn round_trip_through_ns() {
        for n in [0i64, 1, 999, 1_000_000, 123_456_789] {
            assert_eq!(parse_time(&format!("{n} ns")).unwrap(), n);
        }
    }

    #[test]
    fn half_to_even_rounding() {
        // 0.5 ns rounds to 0 (even), 1.5 ns rounds to 2 (even).
        assert_eq!(to_ns(0.5, TimeUnit::Ns), 0);
        assert_eq!(to_ns(1.5, TimeUnit::Ns), 2);
        assert_eq!(to_ns(2.5, TimeUnit::Ns), 2);
    }
}
