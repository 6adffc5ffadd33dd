//! Field coercion for raw JKM records.
//!
//! The JKM feed is loosely typed: victim counts arrive as strings, numbers,
//! empty strings or not at all, and the state field is sometimes null.
//! Nothing here fails. Missing or malformed values degrade to `0` and
//! `UNKNOWN_STATE`.

use serde_json::Value;

use crate::model::{FieldMapping, UNKNOWN_STATE};

/// The three fields of a raw record the dashboard cares about, coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub state: String,
    pub victims: u64,
    pub shelter_name: Option<String>,
}

impl NormalizedRecord {
    /// Reads a record through `fields`. Non-object values are treated as
    /// records with every field absent.
    pub fn from_value(record: &Value, fields: &FieldMapping) -> Self {
        Self {
            state: state_key(record.get(&fields.state)),
            victims: victim_count(record.get(&fields.victims)),
            shelter_name: shelter_name(record.get(&fields.shelter_name)),
        }
    }
}

/// Coerces a victim-count field to a non-negative integer.
///
/// A count must be a non-negative base-10 integer whether it arrives as a
/// JSON number or a string:
/// - unsigned JSON integers are taken as-is; whole floats such as `12.0` too
/// - fractional or negative numbers give 0, as do `"12.9"` and `"-4"`
/// - strings are trimmed and parsed as base-10 integers (optional `+`)
/// - anything else, including absent and null, gives 0
pub fn victim_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(v), _) => v,
            (None, Some(f)) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => f as u64,
            _ => 0,
        },
        Some(Value::String(s)) => parse_count(s),
        _ => 0,
    }
}

fn parse_count(raw: &str) -> u64 {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    // All-digit strings only fail on overflow.
    digits.parse().unwrap_or(u64::MAX)
}

/// Resolves the grouping key for a record's state field.
pub fn state_key(value: Option<&Value>) -> String {
    let key = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    };
    if key.is_empty() {
        UNKNOWN_STATE.to_string()
    } else {
        key
    }
}

/// Shelter names are display-only; blank names are dropped.
pub fn shelter_name(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
