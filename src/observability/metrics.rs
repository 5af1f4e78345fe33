//! Metrics registry for the table store
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only when the store is opened

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one open store
///
/// All counters use Relaxed atomics; readers see eventually consistent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    tables_created: AtomicU64,
    tables_deleted: AtomicU64,
    fields_added: AtomicU64,
    fields_removed: AtomicU64,
    retypes_committed: AtomicU64,
    retypes_rejected: AtomicU64,
    cells_written: AtomicU64,
    /// Cells deleted by retype, field removal or record deletion
    cells_purged: AtomicU64,
    records_created: AtomicU64,
    records_deleted: AtomicU64,
    schema_edit_conflicts: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Schema metrics

    /// Increment tables created counter
    pub fn increment_tables_created(&self) {
        self.tables_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment tables deleted counter
    pub fn increment_tables_deleted(&self) {
        self.tables_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment fields added counter
    pub fn increment_fields_added(&self) {
        self.fields_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment fields removed counter
    pub fn increment_fields_removed(&self) {
        self.fields_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment retypes committed counter
    pub fn increment_retypes_committed(&self) {
        self.retypes_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment retypes rejected counter
    pub fn increment_retypes_rejected(&self) {
        self.retypes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment schema edit conflicts counter
    pub fn increment_schema_edit_conflicts(&self) {
        self.schema_edit_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    // Record metrics

    /// Add to cells written counter
    pub fn add_cells_written(&self, count: u64) {
        self.cells_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Add to cells purged counter
    pub fn add_cells_purged(&self, count: u64) {
        self.cells_purged.fetch_add(count, Ordering::Relaxed);
    }

    /// Add to records created counter
    pub fn add_records_created(&self, count: u64) {
        self.records_created.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment records deleted counter
    pub fn increment_records_deleted(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tables_created: self.tables_created.load(Ordering::Relaxed),
            tables_deleted: self.tables_deleted.load(Ordering::Relaxed),
            fields_added: self.fields_added.load(Ordering::Relaxed),
            fields_removed: self.fields_removed.load(Ordering::Relaxed),
            retypes_committed: self.retypes_committed.load(Ordering::Relaxed),
            retypes_rejected: self.retypes_rejected.load(Ordering::Relaxed),
            cells_written: self.cells_written.load(Ordering::Relaxed),
            cells_purged: self.cells_purged.load(Ordering::Relaxed),
            records_created: self.records_created.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            schema_edit_conflicts: self.schema_edit_conflicts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tables_created: u64,
    pub tables_deleted: u64,
    pub fields_added: u64,
    pub fields_removed: u64,
    pub retypes_committed: u64,
    pub retypes_rejected: u64,
    pub cells_written: u64,
    pub cells_purged: u64,
    pub records_created: u64,
    pub records_deleted: u64,
    pub schema_edit_conflicts: u64,
}
