//! Duration parsing for operator-supplied periods.
//!
//! Accepts an optional sign followed by one or more `<number><unit>` groups,
//! e.g. `10s`, `1h30m`, `1.5s`, `250ms`, `-1s`. A bare `0` is also valid.
//! Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.

use crate::error::ConfigError;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A parsed duration that remembers its sign
///
/// `std::time::Duration` cannot be negative, but operators can type a
/// negative period and must get a clear rejection rather than a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedDuration {
    pub negative: bool,
    pub magnitude: Duration,
}

impl SignedDuration {
    /// Whether the value is strictly below zero (`-0s` is not)
    pub fn is_negative(&self) -> bool {
        self.negative && !self.magnitude.is_zero()
    }
}

/// Parse a duration string
pub fn parse_duration(input: &str) -> Result<SignedDuration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        value: input.to_string(),
    };

    let trimmed = input.trim();
    let (negative, mut rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    if rest == "0" {
        return Ok(SignedDuration {
            negative,
            magnitude: Duration::ZERO,
        });
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(number_end);

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let group = scale(number, unit_nanos(unit).ok_or_else(invalid)?).ok_or_else(invalid)?;
        total = total.checked_add(group).ok_or_else(invalid)?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid())?;
    let nanos = (total % NANOS_PER_SEC) as u32;
    Ok(SignedDuration {
        negative,
        magnitude: Duration::new(secs, nanos),
    })
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3_600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Convert `number` (digits with an optional fraction) of a unit to nanoseconds.
fn scale(number: &str, unit_nanos: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit_nanos)?;

    // Digits beyond nanosecond precision are dropped
    let mut place = unit_nanos;
    for digit in fraction.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        nanos = nanos.checked_add(u128::from(digit - b'0') * place)?;
    }
    Some(nanos)
}
