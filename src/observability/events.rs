//! Observable events of the table store
//!
//! Events are explicit and typed. Each one carries its default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store opened and verified
    StoreOpened,
    /// Store closed
    StoreClosed,

    // Schema registry
    TableCreated,
    TableDeleted,
    TableStatusChanged,
    TableRenamed,
    FieldAdded,
    /// Name, ordering or requiredness changed
    FieldUpdated,
    /// Retype committed
    FieldRetyped,
    /// Retype refused because a stored value would not convert
    FieldRetypeRejected,
    FieldRemoved,
    /// A schema edit could not start in time
    SchemaEditConflict,

    // Record store
    /// Batch write refused as a whole
    RecordBatchRejected,
    /// Cell skipped on read because its field is gone
    OrphanCellSkipped,

    // Bulk loader
    SeedBegin,
    SeedTableCreated,
    /// Table already present, left untouched
    SeedTableSkipped,
    SeedTableFailed,
    SeedCancelled,
    SeedComplete,
    CleanupTableRemoved,
    CleanupTableFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpened => "STORE_OPENED",
            Event::StoreClosed => "STORE_CLOSED",

            Event::TableCreated => "TABLE_CREATED",
            Event::TableDeleted => "TABLE_DELETED",
            Event::TableStatusChanged => "TABLE_STATUS_CHANGED",
            Event::TableRenamed => "TABLE_RENAMED",
            Event::FieldAdded => "FIELD_ADDED",
            Event::FieldUpdated => "FIELD_UPDATED",
            Event::FieldRetyped => "FIELD_RETYPED",
            Event::FieldRetypeRejected => "FIELD_RETYPE_REJECTED",
            Event::FieldRemoved => "FIELD_REMOVED",
            Event::SchemaEditConflict => "SCHEMA_EDIT_CONFLICT",

            Event::RecordBatchRejected => "RECORD_BATCH_REJECTED",
            Event::OrphanCellSkipped => "ORPHAN_CELL_SKIPPED",

            Event::SeedBegin => "SEED_BEGIN",
            Event::SeedTableCreated => "SEED_TABLE_CREATED",
            Event::SeedTableSkipped => "SEED_TABLE_SKIPPED",
            Event::SeedTableFailed => "SEED_TABLE_FAILED",
            Event::SeedCancelled => "SEED_CANCELLED",
            Event::SeedComplete => "SEED_COMPLETE",
            Event::CleanupTableRemoved => "CLEANUP_TABLE_REMOVED",
            Event::CleanupTableFailed => "CLEANUP_TABLE_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SeedTableFailed | Event::CleanupTableFailed => Severity::Error,
            Event::FieldRetypeRejected
            | Event::SchemaEditConflict
            | Event::RecordBatchRejected
            | Event::OrphanCellSkipped
            | Event::SeedCancelled => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
