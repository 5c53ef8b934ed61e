//! Lenient field decoders for external JSON
//!
//! Both the browser extension and the exchange send numbers either as JSON
//! numbers or as strings, and ids either as strings or integers. These
//! helpers are used with `#[serde(default, deserialize_with = "...")]` so
//! that the typed records are validated once at the boundary.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// A scalar JSON value of unknown flavour
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Loose {
    /// Render as a trimmed string, `None` when empty
    pub fn into_string(self) -> Option<String> {
        let s = match self {
            Loose::Bool(b) => b.to_string(),
            Loose::Int(i) => i.to_string(),
            Loose::Float(f) => f.to_string(),
            Loose::Str(s) => s.trim().to_string(),
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    /// Interpret as a decimal; unparsable values become `None`
    pub fn into_decimal(self) -> Option<Decimal> {
        match self {
            Loose::Bool(_) => None,
            Loose::Int(i) => Some(Decimal::from(i)),
            Loose::Float(f) => Decimal::from_f64(f),
            Loose::Str(s) => parse_decimal(&s),
        }
    }

    /// Interpret as an integer
    pub fn into_i64(self) -> Option<i64> {
        match self {
            Loose::Bool(_) => None,
            Loose::Int(i) => Some(i),
            Loose::Float(f) if f.fract() == 0.0 => Some(f as i64),
            Loose::Float(_) => None,
            Loose::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Truthiness as the extension uses it: `true`, `1`, `"yes"`, `"on"`
    pub fn is_truthy(&self) -> bool {
        match self {
            Loose::Bool(b) => *b,
            Loose::Int(i) => *i == 1,
            Loose::Float(f) => *f == 1.0,
            Loose::Str(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        }
    }
}

/// Parse a decimal from a string, accepting a comma as decimal separator
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<Decimal>()
        .or_else(|_| trimmed.replace(',', ".").parse::<Decimal>())
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Optional string from a string or a number
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?.and_then(Loose::into_string))
}

/// Optional decimal from a string or a number
pub fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?.and_then(Loose::into_decimal))
}

/// Optional integer from a string or a number
pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?.and_then(Loose::into_i64))
}

/// Boolean flag from any truthy representation; absent means false
pub fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(|v| v.is_truthy())
        .unwrap_or(false))
}
