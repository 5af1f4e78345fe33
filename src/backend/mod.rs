//! # Persistence Backend
//!
//! The store keeps its working set in memory and hands every change to a
//! backend as one `ChangeSet`. A change set is committed atomically by the
//! backend before it becomes visible to readers.

mod checksum;
mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use serde::{Deserialize, Serialize};

use crate::errors::TableResult;
use crate::ids::{CellId, FieldId, RecordId, TableId};
use crate::records::{Cell, Record};
use crate::schema::{Field, Table};

/// Trait for durable storage of tables, fields, records and cells
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Load everything persisted so far
    fn load(&self) -> TableResult<DatasetSnapshot>;

    /// Persist a change set; either all of it or none of it
    fn commit(&self, changes: &ChangeSet) -> TableResult<()>;

    /// Flush and release resources
    fn close(&self) -> TableResult<()> {
        Ok(())
    }
}

/// A single entity write
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    PutTable(Table),
    DeleteTable(TableId),
    PutField(Field),
    DeleteField(FieldId),
    PutRecord(Record),
    DeleteRecord(RecordId),
    PutCell(Cell),
    DeleteCell(CellId),
}

/// Ordered mutations committed as one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn append(&mut self, other: ChangeSet) {
        self.mutations.extend(other.mutations);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.mutations.iter()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl From<Vec<Mutation>> for ChangeSet {
    fn from(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }
}

/// Serialized form of the whole dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl DatasetSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.fields.is_empty()
            && self.records.is_empty()
            && self.cells.is_empty()
    }
}
