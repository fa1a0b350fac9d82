//! Field filtering.
//!
//! Queries take arbitrary closures, but many filters are "field X equals Y".
//! [`FieldFilter`] expresses those against a record's serialized fields, so
//! the same filter works for any record type, including untyped maps read by
//! the command-line tool.

use crate::error::{Result, ShelfError};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

/// Comparison applied by a [`FieldFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals the value.
    Eq,
    /// Field is missing or differs from the value.
    Ne,
    /// List field has the value as an element, or string field has it as a
    /// substring.
    Contains,
}

/// A condition on one field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Contains, value)
    }

    /// Check a record. A record that fails to serialize to a map never
    /// matches.
    pub fn matches<T: Serialize>(&self, record: &T) -> bool {
        match serde_json::to_value(record) {
            Ok(Value::Object(fields)) => self.matches_field(fields.get(&self.field)),
            _ => false,
        }
    }

    fn matches_field(&self, field: Option<&Value>) -> bool {
        match (self.op, field) {
            (FilterOp::Eq, Some(v)) => *v == self.value,
            (FilterOp::Eq, None) => false,
            (FilterOp::Ne, Some(v)) => *v != self.value,
            (FilterOp::Ne, None) => true,
            (FilterOp::Contains, Some(Value::Array(items))) => items.contains(&self.value),
            (FilterOp::Contains, Some(Value::String(s))) => match &self.value {
                Value::String(needle) => s.contains(needle.as_str()),
                _ => false,
            },
            (FilterOp::Contains, _) => false,
        }
    }
}

/// Parses `field=value`, `field!=value` and `field~value`.
///
/// The value is read as a YAML scalar, so `draft=false` compares against a
/// boolean and `count=3` against a number, while `date=2024-01-01` stays a
/// string, the same way it reads from a file.
impl FromStr for FieldFilter {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        // The first operator wins, so values may contain '=' or '~'.
        let found = s.char_indices().find_map(|(i, c)| match c {
            '!' if s[i..].starts_with("!=") => Some((i, FilterOp::Ne, 2)),
            '~' => Some((i, FilterOp::Contains, 1)),
            '=' => Some((i, FilterOp::Eq, 1)),
            _ => None,
        });
        let Some((at, op, len)) = found else {
            return Err(ShelfError::Validation(format!(
                "invalid filter '{}': expected field=value, field!=value or field~value",
                s
            )));
        };
        let (field, raw) = (&s[..at], &s[at + len..]);

        let field = field.trim();
        if field.is_empty() {
            return Err(ShelfError::Validation(format!(
                "invalid filter '{}': missing field name",
                s
            )));
        }
        Ok(Self::new(field, op, parse_scalar(raw.trim())))
    }
}

/// Read a command-line value the way a YAML file would.
pub fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
        _ => Value::String(raw.to_string()),
    }
}
