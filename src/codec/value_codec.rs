//! Value codec: logical value <-> stored string, keyed by field type
//!
//! Stored forms:
//! - short_text / long_text: trimmed text (short_text length-capped)
//! - number: canonical decimal
//! - boolean: "true" / "false"
//! - date_time: RFC 3339 UTC with `Z`
//! - single_select: the label
//! - multi_select: JSON array of labels, de-duplicated, write order kept
//! - file: trimmed reference
//!
//! Encoding accepts any logical value. A value whose kind does not match
//! the field type is rendered to text and parsed under the field type, so
//! `Text("12")` encodes into a number field and `Number(42.50)` into a text
//! field. Decoding is strict: stored strings must already be canonical.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::decimal::Decimal;
use super::value::{format_timestamp, LogicalValue};
use crate::errors::{TableError, TableResult};
use crate::schema::FieldType;

/// Default cap for short text values, in characters
pub const DEFAULT_SHORT_TEXT_MAX: usize = 500;

/// Stateless converter between logical and stored values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCodec {
    short_text_max: usize,
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self {
            short_text_max: DEFAULT_SHORT_TEXT_MAX,
        }
    }
}

impl ValueCodec {
    pub fn new(short_text_max: usize) -> Self {
        Self { short_text_max }
    }

    pub fn short_text_max(&self) -> usize {
        self.short_text_max
    }

    /// Encodes a logical value for storage under `field_type`.
    ///
    /// # Errors
    ///
    /// - `ValueTooLong` for short text over the cap
    /// - `InvalidValue` when the value cannot be read as the field type
    /// - `InvalidOption` for select labels outside the option list
    pub fn encode(&self, field_type: &FieldType, value: &LogicalValue) -> TableResult<String> {
        match field_type {
            FieldType::ShortText => {
                let text = value.to_text();
                let trimmed = text.trim();
                let len = trimmed.chars().count();
                if len > self.short_text_max {
                    return Err(TableError::ValueTooLong {
                        max: self.short_text_max,
                        actual: len,
                    });
                }
                Ok(trimmed.to_string())
            }
            FieldType::LongText => Ok(value.to_text().trim().to_string()),
            FieldType::Number => match value {
                LogicalValue::Number(d) => Ok(d.to_string()),
                other => {
                    let text = other.to_text();
                    Decimal::parse(&text)
                        .map(String::from)
                        .ok_or_else(|| TableError::invalid_value("number", text))
                }
            },
            FieldType::Boolean => match value {
                LogicalValue::Boolean(b) => Ok(b.to_string()),
                other => {
                    let text = other.to_text();
                    parse_bool(&text)
                        .map(|b| b.to_string())
                        .ok_or_else(|| TableError::invalid_value("boolean", text))
                }
            },
            FieldType::DateTime => match value {
                LogicalValue::DateTime(dt) => Ok(format_timestamp(dt)),
                other => {
                    let text = other.to_text();
                    parse_timestamp(&text)
                        .map(|dt| format_timestamp(&dt))
                        .ok_or_else(|| TableError::invalid_value("date_time", text))
                }
            },
            FieldType::SingleSelect { options } => {
                let label = match value {
                    LogicalValue::Choices(labels) if labels.len() == 1 => labels[0].trim().to_string(),
                    other => other.to_text().trim().to_string(),
                };
                check_option(options, &label)?;
                Ok(label)
            }
            FieldType::MultiSelect { options } => {
                let raw = match value {
                    LogicalValue::Choices(labels) => labels.clone(),
                    LogicalValue::Choice(label) => vec![label.clone()],
                    other => split_labels(&other.to_text())?,
                };
                let labels = dedupe_labels(raw);
                for label in &labels {
                    check_option(options, label)?;
                }
                serde_json::to_string(&labels)
                    .map_err(|e| TableError::Internal(format!("Failed to encode labels: {}", e)))
            }
            FieldType::File => {
                let reference = value.to_text().trim().to_string();
                if reference.is_empty() {
                    return Err(TableError::invalid_value("file", reference));
                }
                Ok(reference)
            }
        }
    }

    /// Decodes a stored string under `field_type`.
    pub fn decode(&self, field_type: &FieldType, stored: &str) -> TableResult<LogicalValue> {
        match field_type {
            FieldType::ShortText | FieldType::LongText => Ok(LogicalValue::Text(stored.to_string())),
            FieldType::Number => Decimal::parse(stored)
                .map(LogicalValue::Number)
                .ok_or_else(|| TableError::invalid_value("number", stored)),
            FieldType::Boolean => match stored {
                "true" => Ok(LogicalValue::Boolean(true)),
                "false" => Ok(LogicalValue::Boolean(false)),
                _ => Err(TableError::invalid_value("boolean", stored)),
            },
            FieldType::DateTime => DateTime::parse_from_rfc3339(stored)
                .map(|dt| LogicalValue::DateTime(dt.with_timezone(&Utc)))
                .map_err(|_| TableError::invalid_value("date_time", stored)),
            FieldType::SingleSelect { options } => {
                check_option(options, stored)?;
                Ok(LogicalValue::Choice(stored.to_string()))
            }
            FieldType::MultiSelect { options } => {
                let labels: Vec<String> = serde_json::from_str(stored)
                    .map_err(|_| TableError::invalid_value("multi_select", stored))?;
                for label in &labels {
                    check_option(options, label)?;
                }
                Ok(LogicalValue::Choices(labels))
            }
            FieldType::File => Ok(LogicalValue::File(stored.to_string())),
        }
    }

    /// Re-encodes a value stored under `from` for a field of type `to`.
    pub fn convert(&self, from: &FieldType, stored: &str, to: &FieldType) -> TableResult<String> {
        let value = self.decode(from, stored)?;
        self.encode(to, &value)
    }
}

fn check_option(options: &[String], label: &str) -> TableResult<()> {
    if options.iter().any(|o| o == label) {
        Ok(())
    } else {
        Err(TableError::InvalidOption {
            value: label.to_string(),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare date.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// JSON array text or comma-separated labels.
fn split_labels(raw: &str) -> TableResult<Vec<String>> {
    let s = raw.trim();
    if s.starts_with('[') {
        return serde_json::from_str(s).map_err(|_| TableError::invalid_value("multi_select", s));
    }
    Ok(s.split(',').map(str::to_string).collect())
}

fn dedupe_labels(raw: Vec<String>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(raw.len());
    for label in raw {
        let label = label.trim();
        if !label.is_empty() && !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}
