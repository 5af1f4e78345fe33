//! Table and field definitions
//!
//! Supported field types:
//! - short_text / long_text: trimmed UTF-8 text
//! - number: finite decimal
//! - boolean
//! - date_time: UTC timestamp
//! - single_select / multi_select: labels from an ordered option list
//! - file: opaque file reference

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FieldId, ProjectId, TableId};

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Length-capped text
    ShortText,
    /// Uncapped text
    LongText,
    /// Finite decimal number
    Number,
    /// true / false
    Boolean,
    /// UTC timestamp
    DateTime,
    /// Exactly one label out of `options`
    SingleSelect {
        /// Allowed labels, in display order
        options: Vec<String>,
    },
    /// Any subset of `options`, kept in write order
    MultiSelect {
        /// Allowed labels, in display order
        options: Vec<String>,
    },
    /// Reference to a stored file
    File,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::ShortText => "short_text",
            FieldType::LongText => "long_text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "date_time",
            FieldType::SingleSelect { .. } => "single_select",
            FieldType::MultiSelect { .. } => "multi_select",
            FieldType::File => "file",
        }
    }

    /// Allowed labels for select types, empty otherwise
    pub fn options(&self) -> &[String] {
        match self {
            FieldType::SingleSelect { options } | FieldType::MultiSelect { options } => options,
            _ => &[],
        }
    }

    pub fn single_select<S: Into<String>>(options: impl IntoIterator<Item = S>) -> Self {
        FieldType::SingleSelect {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn multi_select<S: Into<String>>(options: impl IntoIterator<Item = S>) -> Self {
        FieldType::MultiSelect {
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// Table lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Being created or bulk loaded
    Provisioning,
    /// Open for reads and writes
    Ready,
    /// Writes are rejected
    Disabled,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Provisioning => "provisioning",
            TableStatus::Ready => "ready",
            TableStatus::Disabled => "disabled",
        }
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// Nothing moves back into provisioning once it has left it.
    pub fn can_transition_to(&self, next: TableStatus) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (_, TableStatus::Provisioning) => false,
            _ => true,
        }
    }

    pub fn accepts_writes(&self) -> bool {
        !matches!(self, TableStatus::Disabled)
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub project_id: ProjectId,
    pub name: String,
    /// Machine key, unique per project
    pub external_id: String,
    pub status: TableStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A typed column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub table_id: TableId,
    pub name: String,
    /// Machine key, unique within the table
    pub external_id: String,
    pub display_name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    pub required: bool,
    /// Column position
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Definition of a field to be added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Derived from `name` when absent
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Appended after the last column when absent
    #[serde(default)]
    pub order: Option<i64>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            external_id: None,
            display_name: None,
            field_type,
            required: false,
            order: None,
        }
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }
}

/// Non-type changes to an existing field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub order: Option<i64>,
}

impl FieldPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.external_id.is_none()
            && self.display_name.is_none()
            && self.required.is_none()
            && self.order.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::ShortText.type_name(), "short_text");
        assert_eq!(FieldType::Number.type_name(), "number");
        assert_eq!(FieldType::single_select(["A"]).type_name(), "single_select");
        assert_eq!(FieldType::multi_select(["A"]).type_name(), "multi_select");
    }

    #[test]
    fn test_options_only_on_selects() {
        assert!(FieldType::Boolean.options().is_empty());
        assert_eq!(FieldType::single_select(["A", "B"]).options(), ["A", "B"]);
        assert_eq!(FieldType::multi_select(["A"]).options(), ["A"]);
    }

    #[test]
    fn test_field_type_serde_tagged() {
        let json = serde_json::to_value(FieldType::single_select(["Open", "Closed"])).unwrap();
        assert_eq!(json["type"], "single_select");
        assert_eq!(json["options"][1], "Closed");

        let back: FieldType = serde_json::from_value(json).unwrap();
        assert_eq!(back, FieldType::single_select(["Open", "Closed"]));
    }

    #[test]
    fn test_status_transitions() {
        use TableStatus::*;
        assert!(Provisioning.can_transition_to(Ready));
        assert!(Provisioning.can_transition_to(Disabled));
        assert!(Ready.can_transition_to(Disabled));
        assert!(Disabled.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Provisioning));
        assert!(!Disabled.can_transition_to(Provisioning));
    }

    #[test]
    fn test_disabled_rejects_writes() {
        assert!(TableStatus::Provisioning.accepts_writes());
        assert!(TableStatus::Ready.accepts_writes());
        assert!(!TableStatus::Disabled.accepts_writes());
    }

    #[test]
    fn test_field_spec_builder() {
        let spec = FieldSpec::new("Amount", FieldType::Number)
            .external_id("amount")
            .required(true)
            .order(3);
        assert_eq!(spec.external_id.as_deref(), Some("amount"));
        assert!(spec.required);
        assert_eq!(spec.order, Some(3));
    }

    #[test]
    fn test_empty_patch() {
        assert!(FieldPatch::default().is_empty());
        let patch = FieldPatch {
            required: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
