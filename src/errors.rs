//! # Table Store Errors
//!
//! Every failure is reported synchronously to the caller of the operation
//! that detected it. Nothing here is retried internally.

use thiserror::Error;

/// Result type for table store operations
pub type TableResult<T> = Result<T, TableError>;

/// Table store errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    // Lookup errors
    #[error("Table not found: {0}")]
    UnknownTable(String),

    #[error("Field not found: {0}")]
    UnknownField(String),

    #[error("Record not found: {0}")]
    UnknownRecord(String),

    // Schema errors
    #[error("External id already in use: {0}")]
    DuplicateExternalId(String),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid status transition for table {table}: {from} -> {to}")]
    InvalidStatusTransition {
        table: String,
        from: String,
        to: String,
    },

    #[error("Table is disabled: {0}")]
    TableDisabled(String),

    // Value errors
    #[error("Value too long: {actual} characters (max: {max})")]
    ValueTooLong { max: usize, actual: usize },

    #[error("Invalid value for {expected}: {value}")]
    InvalidValue { expected: String, value: String },

    #[error("'{value}' is not an allowed option")]
    InvalidOption { value: String },

    // Coordination errors
    #[error("Retype of field {field} rejected at cell {cell}: {reason}")]
    IncompatibleRetype {
        field: String,
        cell: String,
        reason: String,
    },

    #[error("Schema edit already in flight for table {0}")]
    SchemaEditConflict(String),

    // Infrastructure
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TableError {
    pub(crate) fn invalid_value(expected: impl Into<String>, value: impl Into<String>) -> Self {
        TableError::InvalidValue {
            expected: expected.into(),
            value: value.into(),
        }
    }

    pub(crate) fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TableError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn poisoned() -> Self {
        TableError::Internal("Lock poisoned".into())
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TableError::UnknownTable(_) => "TABLES_UNKNOWN_TABLE",
            TableError::UnknownField(_) => "TABLES_UNKNOWN_FIELD",
            TableError::UnknownRecord(_) => "TABLES_UNKNOWN_RECORD",
            TableError::DuplicateExternalId(_) => "TABLES_DUPLICATE_EXTERNAL_ID",
            TableError::InvalidName { .. } => "TABLES_INVALID_NAME",
            TableError::InvalidStatusTransition { .. } => "TABLES_INVALID_STATUS_TRANSITION",
            TableError::TableDisabled(_) => "TABLES_TABLE_DISABLED",
            TableError::ValueTooLong { .. } => "TABLES_VALUE_TOO_LONG",
            TableError::InvalidValue { .. } => "TABLES_INVALID_VALUE",
            TableError::InvalidOption { .. } => "TABLES_INVALID_OPTION",
            TableError::IncompatibleRetype { .. } => "TABLES_INCOMPATIBLE_RETYPE",
            TableError::SchemaEditConflict(_) => "TABLES_SCHEMA_EDIT_CONFLICT",
            TableError::Storage(_) => "TABLES_STORAGE",
            TableError::Config(_) => "TABLES_CONFIG",
            TableError::Internal(_) => "TABLES_INTERNAL",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            TableError::UnknownTable(_) => 404,
            TableError::UnknownField(_) => 404,
            TableError::UnknownRecord(_) => 404,
            TableError::DuplicateExternalId(_) => 409,
            TableError::InvalidName { .. } => 400,
            TableError::InvalidStatusTransition { .. } => 409,
            TableError::TableDisabled(_) => 423,
            TableError::ValueTooLong { .. } => 400,
            TableError::InvalidValue { .. } => 400,
            TableError::InvalidOption { .. } => 400,
            TableError::IncompatibleRetype { .. } => 409,
            TableError::SchemaEditConflict(_) => 409,
            TableError::Storage(_) => 500,
            TableError::Config(_) => 500,
            TableError::Internal(_) => 500,
        }
    }

    /// Whether the same request may succeed once concurrent work finishes
    pub fn is_retryable(&self) -> bool {
        matches!(self, TableError::SchemaEditConflict(_))
    }
}
