//! Cache record domain types and boundary validation.
//!
//! Keys and values arrive either as JSON strings or JSON numbers. Both shapes are
//! normalized into a single canonical string before they reach the store.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};
use thiserror::Error;
use time::OffsetDateTime;

pub const KEY_MAX_CHARS: usize = 999;
pub const VALUE_MAX_CHARS: usize = 1900;

/// A key or value as supplied by a client, before normalization.
///
/// Numbers keep the literal text they were written with, so integers wider than
/// any machine type survive intact.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarInput {
    Number(serde_json::Number),
    Text(String),
}

impl<'de> Deserialize<'de> for ScalarInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(number) => Ok(Self::Number(number)),
            serde_json::Value::String(text) => Ok(Self::Text(text)),
            other => Err(de::Error::custom(format!(
                "expected a string or a number, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
    }
}

impl From<&str> for ScalarInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScalarInput {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ScalarInput {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Key,
    Value,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Key => "key",
            Field::Value => "value",
        }
    }

    fn max_chars(self) -> usize {
        match self {
            Field::Key => KEY_MAX_CHARS,
            Field::Value => VALUE_MAX_CHARS,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Required,
    TooShort,
    TooLong,
    TooSmall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: Field,
    pub constraint: Constraint,
    pub message: String,
}

impl FieldViolation {
    fn new(field: Field, constraint: Constraint) -> Self {
        let message = match constraint {
            Constraint::Required => format!("{field} is required"),
            Constraint::TooShort => format!("{field} must be at least 1 character long"),
            Constraint::TooLong => {
                format!("{field} must be at most {} characters long", field.max_chars())
            }
            Constraint::TooSmall => format!("{field} must be a number greater than or equal to 1"),
        };
        Self {
            field,
            constraint,
            message,
        }
    }
}

/// Every rule a request broke, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", summarize(.violations))]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }

    pub fn cites(&self, field: Field, constraint: Constraint) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.constraint == constraint)
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A validated cache key in canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn parse(input: impl Into<ScalarInput>) -> Result<Self, ValidationErrors> {
        normalize(Field::Key, input.into())
            .map(Self)
            .map_err(|violation| ValidationErrors {
                violations: vec![violation],
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated cache value in canonical string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue(String);

impl CacheValue {
    pub fn parse(input: impl Into<ScalarInput>) -> Result<Self, ValidationErrors> {
        normalize(Field::Value, input.into())
            .map(Self)
            .map_err(|violation| ValidationErrors {
                violations: vec![violation],
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Validate an optional key and value together, reporting every violation at once.
pub fn validate_entry(
    key: Option<ScalarInput>,
    value: Option<ScalarInput>,
) -> Result<(CacheKey, CacheValue), ValidationErrors> {
    let key = key
        .ok_or_else(|| FieldViolation::new(Field::Key, Constraint::Required))
        .and_then(|input| normalize(Field::Key, input));
    let value = value
        .ok_or_else(|| FieldViolation::new(Field::Value, Constraint::Required))
        .and_then(|input| normalize(Field::Value, input));

    match (key, value) {
        (Ok(key), Ok(value)) => Ok((CacheKey(key), CacheValue(value))),
        (key, value) => Err(ValidationErrors {
            violations: [key.err(), value.err()].into_iter().flatten().collect(),
        }),
    }
}

fn normalize(field: Field, input: ScalarInput) -> Result<String, FieldViolation> {
    match input {
        ScalarInput::Text(text) => {
            let chars = text.chars().count();
            if chars == 0 {
                Err(FieldViolation::new(field, Constraint::TooShort))
            } else if chars > field.max_chars() {
                Err(FieldViolation::new(field, Constraint::TooLong))
            } else {
                Ok(text)
            }
        }
        ScalarInput::Number(number) => {
            let canonical = number_to_canonical(&number)
                .ok_or_else(|| FieldViolation::new(field, Constraint::TooSmall))?;
            if canonical.len() > field.max_chars() {
                Err(FieldViolation::new(field, Constraint::TooLong))
            } else {
                Ok(canonical)
            }
        }
    }
}

/// Decimal form of a number that is at least 1, or `None` when it is smaller.
///
/// Integer literals are returned digit for digit whatever their width. Fractional
/// and exponent forms go through `f64` and print in shortest round-trip form, so
/// `1e3` becomes `1000`.
fn number_to_canonical(number: &serde_json::Number) -> Option<String> {
    let literal = number.to_string();
    if literal.bytes().all(|b| b.is_ascii_digit()) {
        return literal.bytes().any(|b| b != b'0').then_some(literal);
    }
    number
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 1.0)
        .map(|f| f.to_string())
}

/// Soft-delete lifecycle of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Active,
    Deleted,
}

impl RecordState {
    pub fn from_deleted_flag(is_deleted: bool) -> Self {
        if is_deleted {
            RecordState::Deleted
        } else {
            RecordState::Active
        }
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, RecordState::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub id: i32,
    pub key: String,
    pub value: String,
    pub state: RecordState,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// How a stored value is presented on read.
///
/// Values that are exactly a JSON number literal come back as numbers, everything
/// else as strings. Callers are not told which happened; `"7"` written as text reads
/// back as `7`. Numbers are emitted with their stored digits. Negative zero (`-0`,
/// `-0.0`) stays a string, since it would not read back as the text that was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProjectedValue {
    Number(serde_json::Number),
    Text(String),
}

impl ProjectedValue {
    pub fn project(stored: &str) -> Self {
        match stored.parse::<serde_json::Number>() {
            Ok(number) if !is_negative_zero(stored, &number) => ProjectedValue::Number(number),
            _ => ProjectedValue::Text(stored.to_string()),
        }
    }
}

fn is_negative_zero(literal: &str, number: &serde_json::Number) -> bool {
    literal.starts_with('-') && number.as_f64() == Some(0.0)
}
