//! Record store
//!
//! Every write resolves fields against the current schema, encodes through
//! the codec and commits while holding the dataset write lock. A schema edit
//! therefore lands entirely before or entirely after any record write.

use std::sync::Arc;

use super::types::{Cell, Record, RecordView, RowValues};
use crate::backend::{ChangeSet, Mutation};
use crate::codec::LogicalValue;
use crate::errors::{TableError, TableResult};
use crate::ids::{RecordId, TableId};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{Field, Table};
use crate::store::{Dataset, StoreState};

/// Rows and cells of all tables
#[derive(Debug, Clone)]
pub struct RecordStore {
    state: Arc<StoreState>,
}

impl RecordStore {
    pub(crate) fn new(state: Arc<StoreState>) -> Self {
        Self { state }
    }

    /// Creates an empty record.
    pub fn create_record(&self, table_id: TableId) -> TableResult<Record> {
        let mut data = self.state.write()?;
        writable_table(&data, table_id)?;

        let now = self.state.now();
        let record = Record {
            id: self.state.next_id(),
            table_id,
            created_at: now,
            updated_at: now,
        };
        self.state
            .commit(&mut data, ChangeSet::from(vec![Mutation::PutRecord(record.clone())]))?;
        drop(data);

        self.state.metrics().add_records_created(1);
        Ok(record)
    }

    /// Sets one cell, replacing any value the record already holds for
    /// that field.
    pub fn write_cell(
        &self,
        record_id: RecordId,
        field_external_id: &str,
        value: impl Into<LogicalValue>,
    ) -> TableResult<Cell> {
        let value = value.into();
        let mut data = self.state.write()?;
        let record = writable_record(&data, record_id)?.clone();
        let field = field_in(&data, record.table_id, field_external_id)?;

        let now = self.state.now();
        let cell = self.encode_cell(&data, &record, field, &value, now)?;
        let touched = Record {
            updated_at: now,
            ..record
        };
        let changes = ChangeSet::from(vec![
            Mutation::PutCell(cell.clone()),
            Mutation::PutRecord(touched),
        ]);
        self.state.commit(&mut data, changes)?;
        drop(data);

        self.state.metrics().add_cells_written(1);
        Ok(cell)
    }

    /// Sets several cells of one record as a unit. Nothing is written if
    /// any value is rejected.
    pub fn write_cells(&self, record_id: RecordId, values: &RowValues) -> TableResult<RecordView> {
        let mut data = self.state.write()?;
        let record = writable_record(&data, record_id)?.clone();

        let now = self.state.now();
        let mut changes = ChangeSet::new();
        for (external_id, value) in values {
            let field = field_in(&data, record.table_id, external_id)?;
            changes.push(Mutation::PutCell(
                self.encode_cell(&data, &record, field, value, now)?,
            ));
        }
        let written = changes.len();
        changes.push(Mutation::PutRecord(Record {
            updated_at: now,
            ..record
        }));
        self.state.commit(&mut data, changes)?;

        let view = view_of(&data, self.state.as_ref(), record_id)?;
        drop(data);

        self.state.metrics().add_cells_written(written as u64);
        Ok(view)
    }

    /// Removes the record's value for a field. Returns whether one existed.
    pub fn clear_cell(&self, record_id: RecordId, field_external_id: &str) -> TableResult<bool> {
        let mut data = self.state.write()?;
        let record = writable_record(&data, record_id)?.clone();
        let field = field_in(&data, record.table_id, field_external_id)?;

        let cell_id = match data.cell_for(record_id, field.id) {
            Some(cell) => cell.id,
            None => return Ok(false),
        };
        let changes = ChangeSet::from(vec![
            Mutation::DeleteCell(cell_id),
            Mutation::PutRecord(Record {
                updated_at: self.state.now(),
                ..record
            }),
        ]);
        self.state.commit(&mut data, changes)?;
        Ok(true)
    }

    /// Decoded values of a record keyed by field external id.
    pub fn read_record(&self, record_id: RecordId) -> TableResult<RowValues> {
        self.get_record(record_id).map(|view| view.values)
    }

    pub fn get_record(&self, record_id: RecordId) -> TableResult<RecordView> {
        let data = self.state.read()?;
        view_of(&data, self.state.as_ref(), record_id)
    }

    /// Decoded records of a table, oldest first.
    pub fn list_records(&self, table_id: TableId) -> TableResult<Vec<RecordView>> {
        let data = self.state.read()?;
        table_in(&data, table_id)?;
        data.records_of(table_id)
            .into_iter()
            .map(|record| view_of(&data, self.state.as_ref(), record.id))
            .collect()
    }

    pub fn count_records(&self, table_id: TableId) -> TableResult<usize> {
        let data = self.state.read()?;
        table_in(&data, table_id)?;
        Ok(data.record_count(table_id))
    }

    /// Deletes a record and all of its cells.
    pub fn delete_record(&self, record_id: RecordId) -> TableResult<()> {
        let mut data = self.state.write()?;
        writable_record(&data, record_id)?;

        let changes = data.record_deletion(record_id);
        let purged = changes.len() - 1;
        self.state.commit(&mut data, changes)?;
        drop(data);

        self.state.metrics().increment_records_deleted();
        self.state.metrics().add_cells_purged(purged as u64);
        Ok(())
    }

    /// Creates one record per row. Every row is validated before anything is
    /// written; the first rejected row fails the whole batch.
    pub fn write_record_batch(
        &self,
        table_id: TableId,
        rows: &[RowValues],
    ) -> TableResult<Vec<Record>> {
        let mut data = self.state.write()?;
        let table = writable_table(&data, table_id)?.clone();

        let mut changes = ChangeSet::new();
        let mut records = Vec::with_capacity(rows.len());
        let mut cells = 0u64;

        for (index, row) in rows.iter().enumerate() {
            let now = self.state.now();
            let record = Record {
                id: self.state.next_id(),
                table_id,
                created_at: now,
                updated_at: now,
            };

            let row_cells = row
                .iter()
                .map(|(external_id, value)| {
                    let field = field_in(&data, table_id, external_id)?;
                    self.encode_cell(&data, &record, field, value, now)
                })
                .collect::<TableResult<Vec<Cell>>>();

            let row_cells = match row_cells {
                Ok(row_cells) => row_cells,
                Err(err) => {
                    let index = index.to_string();
                    let reason = err.to_string();
                    log_event_with_fields(
                        Event::RecordBatchRejected,
                        &[
                            ("table", &table.external_id),
                            ("row", &index),
                            ("code", err.code()),
                            ("reason", &reason),
                        ],
                    );
                    return Err(err);
                }
            };

            changes.push(Mutation::PutRecord(record.clone()));
            cells += row_cells.len() as u64;
            for cell in row_cells {
                changes.push(Mutation::PutCell(cell));
            }
            records.push(record);
        }

        self.state.commit(&mut data, changes)?;
        drop(data);

        self.state.metrics().add_records_created(records.len() as u64);
        self.state.metrics().add_cells_written(cells);
        Ok(records)
    }

    /// Encodes `value` for `field`, reusing the id of the cell already in
    /// that slot.
    fn encode_cell(
        &self,
        data: &Dataset,
        record: &Record,
        field: &Field,
        value: &LogicalValue,
        now: chrono::DateTime<chrono::Utc>,
    ) -> TableResult<Cell> {
        let stored = self.state.codec().encode(&field.field_type, value)?;
        let cell = match data.cell_for(record.id, field.id) {
            Some(existing) => Cell {
                value: stored,
                updated_at: now,
                ..existing.clone()
            },
            None => Cell {
                id: self.state.next_id(),
                record_id: record.id,
                field_id: field.id,
                value: stored,
                created_at: now,
                updated_at: now,
            },
        };
        Ok(cell)
    }
}

fn table_in(data: &Dataset, table_id: TableId) -> TableResult<&Table> {
    data.table(table_id)
        .ok_or_else(|| TableError::UnknownTable(table_id.to_string()))
}

fn writable_table(data: &Dataset, table_id: TableId) -> TableResult<&Table> {
    let table = table_in(data, table_id)?;
    if !table.status.accepts_writes() {
        return Err(TableError::TableDisabled(table.external_id.clone()));
    }
    Ok(table)
}

fn writable_record(data: &Dataset, record_id: RecordId) -> TableResult<&Record> {
    let record = data
        .record(record_id)
        .ok_or_else(|| TableError::UnknownRecord(record_id.to_string()))?;
    writable_table(data, record.table_id)?;
    Ok(record)
}

fn field_in<'a>(data: &'a Dataset, table_id: TableId, external_id: &str) -> TableResult<&'a Field> {
    data.field_by_external_id(table_id, external_id)
        .ok_or_else(|| TableError::UnknownField(external_id.to_string()))
}

fn view_of(data: &Dataset, state: &StoreState, record_id: RecordId) -> TableResult<RecordView> {
    let record = data
        .record(record_id)
        .ok_or_else(|| TableError::UnknownRecord(record_id.to_string()))?;

    let mut values = RowValues::new();
    for cell in data.cells_of_record(record_id) {
        let field = match data.field(cell.field_id) {
            Some(field) => field,
            None => {
                let cell_id = cell.id.to_string();
                log_event_with_fields(Event::OrphanCellSkipped, &[("cell", &cell_id)]);
                continue;
            }
        };
        let value = state.codec().decode(&field.field_type, &cell.value)?;
        values.insert(field.external_id.clone(), value);
    }

    Ok(RecordView {
        id: record.id,
        table_id: record.table_id,
        created_at: record.created_at,
        updated_at: record.updated_at,
        values,
    })
}
