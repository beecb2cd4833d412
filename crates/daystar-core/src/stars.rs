// Star-value validation: normalise an integer or integer-string into a
// 0..=10 star count.

use std::num::IntErrorKind;

use serde_json::Value;

use crate::error::ScoreError;

/// Highest star count `validate_stars` will return.
pub const MAX_STARS: u8 = 10;

/// A raw star value as it arrives from a form field or spreadsheet cell.
///
/// Only the two accepted shapes exist as variants. Booleans, floats, lists,
/// maps and missing values are refused when converting from a dynamic
/// [`Value`], so they never reach the integer logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarInput {
    Integer(i64),
    Text(String),
}

impl StarInput {
    /// Resolve the input to an integer without clamping.
    ///
    /// Text must be a base-10 integer once surrounding whitespace is trimmed
    /// (an optional sign is allowed). Integers too large for `i64` saturate
    /// at the nearest bound rather than failing.
    pub fn to_integer(&self) -> Result<i64, ScoreError> {
        match self {
            StarInput::Integer(n) => Ok(*n),
            StarInput::Text(text) => parse_integer_text(text, Overflow::Saturate),
        }
    }

    /// Same parse as [`to_integer`](Self::to_integer), but integers outside
    /// the `i64` range are `InvalidInput` instead of being saturated. Used
    /// for scoring inputs, where a rewritten count would change the score.
    pub fn to_exact_integer(&self) -> Result<i64, ScoreError> {
        match self {
            StarInput::Integer(n) => Ok(*n),
            StarInput::Text(text) => parse_integer_text(text, Overflow::Reject),
        }
    }
}

impl From<i64> for StarInput {
    fn from(n: i64) -> Self {
        StarInput::Integer(n)
    }
}

impl From<&str> for StarInput {
    fn from(text: &str) -> Self {
        StarInput::Text(text.to_string())
    }
}

impl From<String> for StarInput {
    fn from(text: String) -> Self {
        StarInput::Text(text)
    }
}

impl TryFrom<&Value> for StarInput {
    type Error = ScoreError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(StarInput::Text(text.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(StarInput::Integer(i))
                } else if n.is_u64() {
                    // Above i64::MAX: keep the digits and let the caller
                    // decide between saturating and rejecting.
                    Ok(StarInput::Text(n.to_string()))
                } else {
                    Err(ScoreError::TypeMismatch(format!(
                        "expected an integer or integer string, got float {n}"
                    )))
                }
            }
            other => Err(ScoreError::TypeMismatch(format!(
                "expected an integer or integer string, got {}",
                type_name(other)
            ))),
        }
    }
}

/// Clamp a star value into `0..=10`.
pub fn validate_stars(value: &StarInput) -> Result<u8, ScoreError> {
    let n = value.to_integer()?;
    // Clamped into 0..=10 first, so the narrowing cast cannot truncate.
    Ok(n.clamp(0, i64::from(MAX_STARS)) as u8)
}

/// [`validate_stars`] for a dynamically typed cell.
pub fn validate_stars_value(value: &Value) -> Result<u8, ScoreError> {
    validate_stars(&StarInput::try_from(value)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overflow {
    Saturate,
    Reject,
}

fn parse_integer_text(text: &str, overflow: Overflow) -> Result<i64, ScoreError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix(&['+', '-'][..])
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScoreError::InvalidFormat(format!(
            "{text:?} is not an integer string"
        )));
    }

    match trimmed.parse::<i64>() {
        Ok(n) => Ok(n),
        Err(e) => match (e.kind(), overflow) {
            (IntErrorKind::PosOverflow, Overflow::Saturate) => Ok(i64::MAX),
            (IntErrorKind::NegOverflow, Overflow::Saturate) => Ok(i64::MIN),
            (IntErrorKind::PosOverflow | IntErrorKind::NegOverflow, Overflow::Reject) => {
                Err(ScoreError::InvalidInput(format!(
                    "{trimmed} is outside the 64-bit integer range"
                )))
            }
            _ => Err(ScoreError::InvalidFormat(format!(
                "{text:?} is not an integer string"
            ))),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
