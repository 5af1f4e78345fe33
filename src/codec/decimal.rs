//! Canonical decimal numbers
//!
//! Numbers are kept as text so the digits a caller wrote survive a round
//! trip: `"42.50"` stays `"42.50"`. Canonical form strips a leading `+`,
//! redundant leading zeros, a trailing bare `.`, and the sign of zero.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
            .expect("decimal pattern is valid")
    })
}

/// A finite decimal number in canonical text form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal(String);

impl Decimal {
    /// Parses decimal text, returning `None` for anything that is not a
    /// finite number.
    pub fn parse(raw: &str) -> Option<Decimal> {
        let s = raw.trim();
        if !decimal_pattern().is_match(s) {
            return None;
        }

        let (negative, body) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa, exponent) = match body.find(|c| c == 'e' || c == 'E') {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };

        // Plain digits are always finite; only an exponent can push the
        // value out of range.
        if exponent.is_some() && !s.parse::<f64>().map_or(false, f64::is_finite) {
            return None;
        }

        let (int_part, frac_part) = match mantissa.find('.') {
            Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
            None => (mantissa, ""),
        };
        let is_zero = mantissa.bytes().all(|b| b == b'0' || b == b'.');

        let int_part = int_part.trim_start_matches('0');

        let mut canonical = String::with_capacity(s.len() + 1);
        if negative && !is_zero {
            canonical.push('-');
        }
        canonical.push_str(if int_part.is_empty() { "0" } else { int_part });
        if !frac_part.is_empty() {
            canonical.push('.');
            canonical.push_str(frac_part);
        }
        if let Some(exp) = exponent {
            canonical.push('e');
            canonical.push_str(exp.strip_prefix('+').unwrap_or(exp));
        }

        Some(Decimal(canonical))
    }

    pub fn from_i64(value: i64) -> Decimal {
        Decimal(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Decimal {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Decimal::parse(&value).ok_or_else(|| format!("not a finite decimal: {}", value))
    }
}

impl From<Decimal> for String {
    fn from(value: Decimal) -> Self {
        value.0
    }
}
