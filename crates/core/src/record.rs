use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minute-resolution canonical timestamp form. Seconds are appended only when non-zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";
const TIMESTAMP_FORMAT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

/// Separator between parts of a composite identity key.
pub const KEY_SEPARATOR: char = '|';

/// Typed field value. Source data arrives as text; normalizers assign the type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Null,
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Plain JSON rendering for consumers (timestamps as canonical strings).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Timestamp(ts) => serde_json::Value::String(format_timestamp(ts)),
            FieldValue::Null => serde_json::Value::Null,
        }
    }

    fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Timestamp(ts) => write!(f, "{}", format_timestamp(ts)),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

/// Render a timestamp in canonical form.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.second() == 0 && ts.nanosecond() == 0 {
        ts.format(TIMESTAMP_FORMAT).to_string()
    } else {
        ts.format(TIMESTAMP_FORMAT_SECONDS).to_string()
    }
}

// ── Identity key ──────────────────────────────────────────────

/// The named field values that decide which stored document a record updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityKey {
    parts: Vec<(String, FieldValue)>,
}

impl IdentityKey {
    pub fn new(parts: Vec<(String, FieldValue)>) -> Result<Self, CoreError> {
        if parts.is_empty() {
            return Err(CoreError::EmptyKey);
        }
        if let Some((name, _)) = parts.iter().find(|(_, v)| v.is_null()) {
            return Err(CoreError::NullKeyField(name.clone()));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[(String, FieldValue)] {
        &self.parts
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// Key values joined by [`KEY_SEPARATOR`]; a single-part key renders as its value.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for (i, (_, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push(KEY_SEPARATOR);
            }
            out.push_str(&value.to_string());
        }
        out
    }

    /// Part-wise ordering: numbers and timestamps compare by value, not text.
    pub fn compare(&self, other: &IdentityKey) -> Ordering {
        for ((_, a), (_, b)) in self.parts.iter().zip(other.parts.iter()) {
            match a.compare(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.parts.len().cmp(&other.parts.len())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// ── Record ────────────────────────────────────────────────────

/// One normalized observation: ordered payload fields plus the identity key drawn from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    key: IdentityKey,
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    /// Build a record, taking the identity key from the named fields in order.
    pub fn new(key_fields: &[&str], fields: IndexMap<String, FieldValue>) -> Result<Self, CoreError> {
        let parts = key_fields
            .iter()
            .map(|name| {
                fields
                    .get(*name)
                    .map(|v| (name.to_string(), v.clone()))
                    .ok_or_else(|| CoreError::MissingKeyField(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            key: IdentityKey::new(parts)?,
            fields,
        })
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}
