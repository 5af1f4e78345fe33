//! # Consistency Coordinator
//!
//! Mediates schema edits against live data.
//!
//! - One schema edit in flight per table; others wait up to the configured
//!   budget and then fail with `SchemaEditConflict`
//! - Retype converts every cell of the field or changes nothing
//! - Field removal deletes the field and all of its cells in one commit
//!
//! Record writes take only the dataset lock. Every schema change lands in a
//! single commit under that lock, so record operations never see a
//! half-applied edit.

mod edit_lock;
mod retype;

pub use edit_lock::{EditGuard, EditLocks, EditState};
pub use retype::{RetypeMode, RetypeReport};

use std::sync::Arc;

use retype::RetypePlan;

use crate::errors::{TableError, TableResult};
use crate::ids::{FieldId, TableId};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{naming, Field, FieldType};
use crate::store::StoreState;

/// Serializes schema edits and keeps cells valid across them
#[derive(Debug, Clone)]
pub struct ConsistencyCoordinator {
    state: Arc<StoreState>,
}

impl ConsistencyCoordinator {
    pub(crate) fn new(state: Arc<StoreState>) -> Self {
        Self { state }
    }

    /// Current edit state of a table
    pub fn edit_state(&self, table_id: TableId) -> EditState {
        self.state.locks().state(table_id)
    }

    /// Holds the table's edit slot until the guard drops.
    pub fn begin_edit(&self, table_id: TableId) -> TableResult<EditGuard<'_>> {
        self.state.begin_edit(table_id)
    }

    /// Changes a field's type, converting every stored cell.
    ///
    /// Cells are planned under the read lock. If any cell of the field was
    /// written before the write lock is taken, the plan is rebuilt under the
    /// write lock, so the committed plan always matches the cells it replaces.
    pub fn retype_field(
        &self,
        field_id: FieldId,
        new_type: FieldType,
        mode: RetypeMode,
    ) -> TableResult<RetypeReport> {
        let new_type = naming::normalize_field_type(new_type)?;
        let table_id = self.table_of(field_id)?;
        let _guard = self.begin_edit(table_id)?;

        let (field, revision, plan) = {
            let data = self.state.read()?;
            let field = data
                .field(field_id)
                .cloned()
                .ok_or_else(|| TableError::UnknownField(field_id.to_string()))?;
            let plan = RetypePlan::build(
                self.state.codec(),
                &data,
                &field,
                &new_type,
                self.state.now(),
            );
            (field, data.field_revision(field_id), plan)
        };

        let mut data = self.state.write()?;
        let plan = if data.field_revision(field_id) == revision {
            plan
        } else {
            RetypePlan::build(self.state.codec(), &data, &field, &new_type, self.state.now())
        };

        if mode == RetypeMode::Strict {
            if let Some(err) = plan.rejection(&field) {
                drop(data);
                self.state.metrics().increment_retypes_rejected();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::FieldRetypeRejected,
                    &[
                        ("field", &field.external_id),
                        ("from", field.field_type.type_name()),
                        ("to", new_type.type_name()),
                        ("reason", &reason),
                    ],
                );
                return Err(err);
            }
        }

        let retyped = Field {
            field_type: new_type,
            updated_at: self.state.now(),
            ..field.clone()
        };
        let (changes, rewritten, purged) = plan.into_changes(retyped.clone(), mode);
        self.state.commit(&mut data, changes)?;
        drop(data);

        let metrics = self.state.metrics();
        metrics.increment_retypes_committed();
        metrics.add_cells_written(rewritten as u64);
        metrics.add_cells_purged(purged as u64);

        let rewritten_str = rewritten.to_string();
        let purged_str = purged.to_string();
        log_event_with_fields(
            Event::FieldRetyped,
            &[
                ("field", &retyped.external_id),
                ("from", field.field_type.type_name()),
                ("to", retyped.field_type.type_name()),
                ("rewritten", &rewritten_str),
                ("purged", &purged_str),
            ],
        );

        Ok(RetypeReport {
            field: retyped,
            rewritten,
            purged,
        })
    }

    /// Deletes a field and every cell that references it. Returns the number
    /// of cells deleted.
    pub fn remove_field(&self, field_id: FieldId) -> TableResult<usize> {
        let table_id = self.table_of(field_id)?;
        let _guard = self.begin_edit(table_id)?;

        let mut data = self.state.write()?;
        let field = data
            .field(field_id)
            .cloned()
            .ok_or_else(|| TableError::UnknownField(field_id.to_string()))?;
        let changes = data.field_deletion(field_id);
        let purged = changes.len() - 1;
        self.state.commit(&mut data, changes)?;
        drop(data);

        self.state.metrics().increment_fields_removed();
        self.state.metrics().add_cells_purged(purged as u64);
        let purged_str = purged.to_string();
        log_event_with_fields(
            Event::FieldRemoved,
            &[("field", &field.external_id), ("purged", &purged_str)],
        );
        Ok(purged)
    }

    /// Deletes a table with its fields, records and cells.
    pub fn delete_table(&self, table_id: TableId) -> TableResult<()> {
        let _guard = self.begin_edit(table_id)?;

        let mut data = self.state.write()?;
        let table = data
            .table(table_id)
            .cloned()
            .ok_or_else(|| TableError::UnknownTable(table_id.to_string()))?;
        let records = data.record_count(table_id);
        let changes = data.table_deletion(table_id);
        self.state.commit(&mut data, changes)?;
        drop(data);

        self.state.metrics().increment_tables_deleted();
        let records_str = records.to_string();
        log_event_with_fields(
            Event::TableDeleted,
            &[
                ("table", &table.external_id),
                ("project", table.project_id.as_str()),
                ("records", &records_str),
            ],
        );
        Ok(())
    }

    fn table_of(&self, field_id: FieldId) -> TableResult<TableId> {
        let data = self.state.read()?;
        data.field(field_id)
            .map(|f| f.table_id)
            .ok_or_else(|| TableError::UnknownField(field_id.to_string()))
    }
}
