//! Logical cell values
//!
//! A `LogicalValue` is what callers read and write. Its stored form is
//! always a string produced by the value codec for the field's type.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::decimal::Decimal;
use crate::errors::{TableError, TableResult};

/// A typed value as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LogicalValue {
    Text(String),
    Number(Decimal),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    /// One select label
    Choice(String),
    /// Several select labels, in order
    Choices(Vec<String>),
    /// Opaque file reference
    File(String),
}

impl LogicalValue {
    pub fn text(value: impl Into<String>) -> Self {
        LogicalValue::Text(value.into())
    }

    /// Parses a number from text.
    pub fn number(value: &str) -> TableResult<Self> {
        Decimal::parse(value)
            .map(LogicalValue::Number)
            .ok_or_else(|| TableError::invalid_value("number", value))
    }

    pub fn choices<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        LogicalValue::Choices(labels.into_iter().map(Into::into).collect())
    }

    /// Renders the value as plain text.
    ///
    /// This is the bridge used when a value meets a field of another type:
    /// the text form is parsed under the target type.
    pub fn to_text(&self) -> String {
        match self {
            LogicalValue::Text(s) | LogicalValue::Choice(s) | LogicalValue::File(s) => s.clone(),
            LogicalValue::Number(d) => d.to_string(),
            LogicalValue::Boolean(b) => b.to_string(),
            LogicalValue::DateTime(dt) => format_timestamp(dt),
            LogicalValue::Choices(labels) => labels.join(", "),
        }
    }

    /// Converts a loosely typed JSON payload value.
    ///
    /// `null` yields `None`, meaning "no value". Objects are rejected.
    pub fn from_json(value: &JsonValue) -> TableResult<Option<Self>> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Bool(b) => Ok(Some(LogicalValue::Boolean(*b))),
            JsonValue::Number(n) => LogicalValue::number(&n.to_string()).map(Some),
            JsonValue::String(s) => Ok(Some(LogicalValue::Text(s.clone()))),
            JsonValue::Array(items) => {
                let mut labels = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        JsonValue::String(s) => labels.push(s.clone()),
                        other => labels.push(other.to_string()),
                    }
                }
                Ok(Some(LogicalValue::Choices(labels)))
            }
            JsonValue::Object(_) => Err(TableError::invalid_value("scalar or list", value.to_string())),
        }
    }

    /// Plain JSON rendering for output surfaces.
    pub fn to_json(&self) -> JsonValue {
        match self {
            LogicalValue::Text(s) | LogicalValue::Choice(s) | LogicalValue::File(s) => {
                JsonValue::String(s.clone())
            }
            LogicalValue::Number(d) => serde_json::from_str::<serde_json::Number>(d.as_str())
                .map(JsonValue::Number)
                .unwrap_or_else(|_| JsonValue::String(d.to_string())),
            LogicalValue::Boolean(b) => JsonValue::Bool(*b),
            LogicalValue::DateTime(dt) => JsonValue::String(format_timestamp(dt)),
            LogicalValue::Choices(labels) => {
                JsonValue::Array(labels.iter().cloned().map(JsonValue::String).collect())
            }
        }
    }
}

/// ISO-8601 UTC with a `Z` suffix and only as much sub-second precision as needed.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl From<&str> for LogicalValue {
    fn from(value: &str) -> Self {
        LogicalValue::Text(value.to_string())
    }
}

impl From<String> for LogicalValue {
    fn from(value: String) -> Self {
        LogicalValue::Text(value)
    }
}

impl From<bool> for LogicalValue {
    fn from(value: bool) -> Self {
        LogicalValue::Boolean(value)
    }
}

impl From<i64> for LogicalValue {
    fn from(value: i64) -> Self {
        LogicalValue::Number(Decimal::from_i64(value))
    }
}

impl From<i32> for LogicalValue {
    fn from(value: i32) -> Self {
        LogicalValue::Number(Decimal::from_i64(value.into()))
    }
}

impl From<Decimal> for LogicalValue {
    fn from(value: Decimal) -> Self {
        LogicalValue::Number(value)
    }
}

impl From<DateTime<Utc>> for LogicalValue {
    fn from(value: DateTime<Utc>) -> Self {
        LogicalValue::DateTime(value)
    }
}
