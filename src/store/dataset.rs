//! In-memory dataset with ownership indexes
//!
//! Entities are kept in flat maps keyed by id. Ownership (table -> fields,
//! table -> records, record -> cells, field -> cells) lives in separate
//! indexes keyed by the owning id, so cascades are index walks rather than
//! object graph traversals.
//!
//! The (record, field) -> cell index is what upholds one cell per field per
//! record: `PutCell` replaces whatever cell held that slot.

use std::collections::{HashMap, HashSet};

use crate::backend::{ChangeSet, DatasetSnapshot, Mutation};
use crate::codec::ValueCodec;
use crate::errors::{TableError, TableResult};
use crate::ids::{CellId, FieldId, ProjectId, RecordId, TableId};
use crate::records::{Cell, Record};
use crate::schema::{Field, Table};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tables: HashMap<TableId, Table>,
    fields: HashMap<FieldId, Field>,
    records: HashMap<RecordId, Record>,
    cells: HashMap<CellId, Cell>,

    table_fields: HashMap<TableId, HashSet<FieldId>>,
    table_records: HashMap<TableId, HashSet<RecordId>>,
    record_cells: HashMap<RecordId, HashMap<FieldId, CellId>>,
    field_cells: HashMap<FieldId, HashSet<CellId>>,

    /// Bumped on every cell write or delete for the field. Not persisted.
    field_revisions: HashMap<FieldId, u64>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds indexes from a snapshot, rejecting snapshots that break
    /// ownership or uniqueness rules.
    pub fn from_snapshot(snapshot: DatasetSnapshot) -> TableResult<Self> {
        let mut data = Dataset::new();

        let mut table_keys = HashSet::new();
        for table in snapshot.tables {
            if !table_keys.insert((table.project_id.clone(), table.external_id.clone())) {
                return Err(corrupt(format!(
                    "table external id '{}' repeated in project {}",
                    table.external_id, table.project_id
                )));
            }
            data.apply(&Mutation::PutTable(table));
        }

        let mut field_keys = HashSet::new();
        for field in snapshot.fields {
            if !data.tables.contains_key(&field.table_id) {
                return Err(corrupt(format!("field {} has no table", field.id)));
            }
            if !field_keys.insert((field.table_id, field.external_id.clone())) {
                return Err(corrupt(format!(
                    "field external id '{}' repeated in table {}",
                    field.external_id, field.table_id
                )));
            }
            data.apply(&Mutation::PutField(field));
        }

        for record in snapshot.records {
            if !data.tables.contains_key(&record.table_id) {
                return Err(corrupt(format!("record {} has no table", record.id)));
            }
            data.apply(&Mutation::PutRecord(record));
        }

        for cell in snapshot.cells {
            let record = data
                .records
                .get(&cell.record_id)
                .ok_or_else(|| corrupt(format!("cell {} has no record", cell.id)))?;
            let field = data
                .fields
                .get(&cell.field_id)
                .ok_or_else(|| corrupt(format!("cell {} has no field", cell.id)))?;
            if field.table_id != record.table_id {
                return Err(corrupt(format!("cell {} crosses tables", cell.id)));
            }
            if data.cell_for(cell.record_id, cell.field_id).is_some() {
                return Err(corrupt(format!(
                    "record {} holds two cells for field {}",
                    cell.record_id, cell.field_id
                )));
            }
            data.apply(&Mutation::PutCell(cell));
        }

        data.field_revisions.clear();
        Ok(data)
    }

    /// Produces a snapshot with entities in creation order.
    pub fn to_snapshot(&self) -> DatasetSnapshot {
        let mut tables: Vec<Table> = self.tables.values().cloned().collect();
        tables.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        let mut fields: Vec<Field> = self.fields.values().cloned().collect();
        fields.sort_by(|a, b| (a.table_id, a.order, a.id).cmp(&(b.table_id, b.order, b.id)));

        let mut records: Vec<Record> = self.records.values().cloned().collect();
        records.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        let mut cells: Vec<Cell> = self.cells.values().cloned().collect();
        cells.sort_by(|a, b| (a.record_id, a.field_id).cmp(&(b.record_id, b.field_id)));

        DatasetSnapshot {
            tables,
            fields,
            records,
            cells,
        }
    }

    /// Checks that every cell decodes under its field's current type.
    pub fn verify_cells(&self, codec: &ValueCodec) -> TableResult<()> {
        for cell in self.cells.values() {
            let field = self
                .fields
                .get(&cell.field_id)
                .ok_or_else(|| corrupt(format!("cell {} has no field", cell.id)))?;
            codec.decode(&field.field_type, &cell.value).map_err(|e| {
                corrupt(format!(
                    "cell {} does not decode as {}: {}",
                    cell.id,
                    field.field_type.type_name(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    pub fn apply_all(&mut self, changes: &ChangeSet) {
        for mutation in changes.iter() {
            self.apply(mutation);
        }
    }

    pub fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::PutTable(table) => {
                self.table_fields.entry(table.id).or_default();
                self.table_records.entry(table.id).or_default();
                self.tables.insert(table.id, table.clone());
            }
            Mutation::DeleteTable(id) => {
                self.tables.remove(id);
                self.table_fields.remove(id);
                self.table_records.remove(id);
            }
            Mutation::PutField(field) => {
                self.table_fields
                    .entry(field.table_id)
                    .or_default()
                    .insert(field.id);
                self.field_cells.entry(field.id).or_default();
                self.fields.insert(field.id, field.clone());
            }
            Mutation::DeleteField(id) => {
                if let Some(field) = self.fields.remove(id) {
                    if let Some(ids) = self.table_fields.get_mut(&field.table_id) {
                        ids.remove(id);
                    }
                }
                self.field_cells.remove(id);
                self.field_revisions.remove(id);
            }
            Mutation::PutRecord(record) => {
                self.table_records
                    .entry(record.table_id)
                    .or_default()
                    .insert(record.id);
                self.record_cells.entry(record.id).or_default();
                self.records.insert(record.id, record.clone());
            }
            Mutation::DeleteRecord(id) => {
                if let Some(record) = self.records.remove(id) {
                    if let Some(ids) = self.table_records.get_mut(&record.table_id) {
                        ids.remove(id);
                    }
                }
                self.record_cells.remove(id);
            }
            Mutation::PutCell(cell) => {
                let slot = self.record_cells.entry(cell.record_id).or_default();
                if let Some(previous) = slot.insert(cell.field_id, cell.id) {
                    if previous != cell.id {
                        self.cells.remove(&previous);
                        if let Some(ids) = self.field_cells.get_mut(&cell.field_id) {
                            ids.remove(&previous);
                        }
                    }
                }
                self.field_cells
                    .entry(cell.field_id)
                    .or_default()
                    .insert(cell.id);
                self.cells.insert(cell.id, cell.clone());
                *self.field_revisions.entry(cell.field_id).or_insert(0) += 1;
            }
            Mutation::DeleteCell(id) => {
                if let Some(cell) = self.cells.remove(id) {
                    if let Some(slot) = self.record_cells.get_mut(&cell.record_id) {
                        if slot.get(&cell.field_id) == Some(id) {
                            slot.remove(&cell.field_id);
                        }
                    }
                    if let Some(ids) = self.field_cells.get_mut(&cell.field_id) {
                        ids.remove(id);
                    }
                    *self.field_revisions.entry(cell.field_id).or_insert(0) += 1;
                }
            }
        }
    }

    // Lookups

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(&id)
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn tables_in_project<'a>(&'a self, project: &'a ProjectId) -> impl Iterator<Item = &'a Table> {
        self.tables.values().filter(move |t| &t.project_id == project)
    }

    pub fn find_table(&self, project: &ProjectId, external_id: &str) -> Option<&Table> {
        self.tables
            .values()
            .find(|t| &t.project_id == project && t.external_id == external_id)
    }

    /// Fields of a table in column order (ties broken by creation, then id).
    pub fn fields_of(&self, table_id: TableId) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self
            .table_fields
            .get(&table_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.fields.get(id))
            .collect();
        fields.sort_by(|a, b| (a.order, a.created_at, a.id).cmp(&(b.order, b.created_at, b.id)));
        fields
    }

    pub fn field_by_external_id(&self, table_id: TableId, external_id: &str) -> Option<&Field> {
        self.table_fields
            .get(&table_id)?
            .iter()
            .filter_map(|id| self.fields.get(id))
            .find(|f| f.external_id == external_id)
    }

    /// Records of a table in creation order.
    pub fn records_of(&self, table_id: TableId) -> Vec<&Record> {
        let mut records: Vec<&Record> = self
            .table_records
            .get(&table_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
            .collect();
        records.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        records
    }

    pub fn record_count(&self, table_id: TableId) -> usize {
        self.table_records.get(&table_id).map_or(0, |ids| ids.len())
    }

    pub fn cell_for(&self, record_id: RecordId, field_id: FieldId) -> Option<&Cell> {
        let cell_id = self.record_cells.get(&record_id)?.get(&field_id)?;
        self.cells.get(cell_id)
    }

    pub fn cells_of_record(&self, record_id: RecordId) -> Vec<&Cell> {
        self.record_cells
            .get(&record_id)
            .into_iter()
            .flat_map(|slots| slots.values())
            .filter_map(|id| self.cells.get(id))
            .collect()
    }

    pub fn cells_of_field(&self, field_id: FieldId) -> Vec<&Cell> {
        let mut cells: Vec<&Cell> = self
            .field_cells
            .get(&field_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.cells.get(id))
            .collect();
        cells.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        cells
    }

    pub fn field_revision(&self, field_id: FieldId) -> u64 {
        self.field_revisions.get(&field_id).copied().unwrap_or(0)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    // Cascades

    /// Deletes a record and its cells.
    pub fn record_deletion(&self, record_id: RecordId) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for cell in self.cells_of_record(record_id) {
            changes.push(Mutation::DeleteCell(cell.id));
        }
        changes.push(Mutation::DeleteRecord(record_id));
        changes
    }

    /// Deletes a field and every cell that references it.
    pub fn field_deletion(&self, field_id: FieldId) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for cell in self.cells_of_field(field_id) {
            changes.push(Mutation::DeleteCell(cell.id));
        }
        changes.push(Mutation::DeleteField(field_id));
        changes
    }

    /// Deletes a table with all of its fields, records and cells.
    pub fn table_deletion(&self, table_id: TableId) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for record in self.records_of(table_id) {
            changes.append(self.record_deletion(record.id));
        }
        for field in self.fields_of(table_id) {
            changes.push(Mutation::DeleteField(field.id));
        }
        changes.push(Mutation::DeleteTable(table_id));
        changes
    }
}

fn corrupt(message: String) -> TableError {
    TableError::Storage(format!("Inconsistent dataset: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, TableStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn table(project: &str, external_id: &str) -> Table {
        let now = Utc::now();
        Table {
            id: TableId(Uuid::new_v4()),
            project_id: ProjectId::new(project),
            name: external_id.to_string(),
            external_id: external_id.to_string(),
            status: TableStatus::Ready,
            created_at: now,
            updated_at: now,
        }
    }

    fn field(table_id: TableId, external_id: &str, order: i64) -> Field {
        let now = Utc::now();
        Field {
            id: FieldId(Uuid::new_v4()),
            table_id,
            name: external_id.to_string(),
            external_id: external_id.to_string(),
            display_name: external_id.to_string(),
            field_type: FieldType::ShortText,
            required: false,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    fn record(table_id: TableId) -> Record {
        let now = Utc::now();
        Record {
            id: RecordId(Uuid::new_v4()),
            table_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn cell(record_id: RecordId, field_id: FieldId, value: &str) -> Cell {
        let now = Utc::now();
        Cell {
            id: CellId(Uuid::new_v4()),
            record_id,
            field_id,
            value: value.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_put_cell_replaces_slot() {
        let mut data = Dataset::new();
        let t = table("p", "t");
        let f = field(t.id, "name", 1);
        let r = record(t.id);
        data.apply(&Mutation::PutTable(t.clone()));
        data.apply(&Mutation::PutField(f.clone()));
        data.apply(&Mutation::PutRecord(r.clone()));

        data.apply(&Mutation::PutCell(cell(r.id, f.id, "a")));
        data.apply(&Mutation::PutCell(cell(r.id, f.id, "b")));

        assert_eq!(data.cells_of_record(r.id).len(), 1);
        assert_eq!(data.cells_of_field(f.id).len(), 1);
        assert_eq!(data.cell_for(r.id, f.id).unwrap().value, "b");
        assert_eq!(data.cell_count(), 1);
        assert_eq!(data.field_revision(f.id), 2);
    }

    #[test]
    fn test_find_table_is_scoped_to_project() {
        let mut data = Dataset::new();
        let a = table("p1", "orders");
        let b = table("p2", "orders");
        data.apply(&Mutation::PutTable(a.clone()));
        data.apply(&Mutation::PutTable(b.clone()));

        let found = {
            let project = ProjectId::new("p2");
            data.find_table(&project, "orders").cloned()
        };
        assert_eq!(found.map(|t| t.id), Some(b.id));
        assert!(data.find_table(&ProjectId::new("p3"), "orders").is_none());
        assert_eq!(data.tables_in_project(&ProjectId::new("p1")).count(), 1);
    }

    #[test]
    fn test_table_deletion_cascades() {
        let mut data = Dataset::new();
        let t = table("p", "t");
        let f = field(t.id, "name", 1);
        let r = record(t.id);
        data.apply(&Mutation::PutTable(t.clone()));
        data.apply(&Mutation::PutField(f.clone()));
        data.apply(&Mutation::PutRecord(r.clone()));
        data.apply(&Mutation::PutCell(cell(r.id, f.id, "a")));

        let changes = data.table_deletion(t.id);
        data.apply_all(&changes);

        assert!(data.table(t.id).is_none());
        assert!(data.field(f.id).is_none());
        assert!(data.record(r.id).is_none());
        assert_eq!(data.cell_count(), 0);
    }

    #[test]
    fn test_fields_sorted_by_order() {
        let mut data = Dataset::new();
        let t = table("p", "t");
        data.apply(&Mutation::PutTable(t.clone()));
        data.apply(&Mutation::PutField(field(t.id, "c", 3)));
        data.apply(&Mutation::PutField(field(t.id, "a", 1)));
        data.apply(&Mutation::PutField(field(t.id, "b", 2)));

        let names: Vec<_> = data.fields_of(t.id).iter().map(|f| f.external_id.clone()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_snapshot_round_trip_rebuilds_indexes() {
        let mut data = Dataset::new();
        let t = table("p", "t");
        let f = field(t.id, "name", 1);
        let r = record(t.id);
        data.apply(&Mutation::PutTable(t.clone()));
        data.apply(&Mutation::PutField(f.clone()));
        data.apply(&Mutation::PutRecord(r.clone()));
        data.apply(&Mutation::PutCell(cell(r.id, f.id, "a")));

        let rebuilt = Dataset::from_snapshot(data.to_snapshot()).unwrap();
        assert_eq!(rebuilt.cell_for(r.id, f.id).unwrap().value, "a");
        assert_eq!(rebuilt.find_table(&ProjectId::new("p"), "t").unwrap().id, t.id);
        assert_eq!(rebuilt.field_revision(f.id), 0);
    }

    #[test]
    fn test_snapshot_rejects_cross_table_cell() {
        let t1 = table("p", "one");
        let t2 = table("p", "two");
        let f = field(t1.id, "name", 1);
        let r = record(t2.id);
        let snapshot = DatasetSnapshot {
            tables: vec![t1, t2],
            fields: vec![f.clone()],
            records: vec![r.clone()],
            cells: vec![cell(r.id, f.id, "x")],
        };
        assert!(matches!(
            Dataset::from_snapshot(snapshot),
            Err(TableError::Storage(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_duplicate_slot() {
        let t = table("p", "t");
        let f = field(t.id, "name", 1);
        let r = record(t.id);
        let snapshot = DatasetSnapshot {
            tables: vec![t],
            fields: vec![f.clone()],
            records: vec![r.clone()],
            cells: vec![cell(r.id, f.id, "x"), cell(r.id, f.id, "y")],
        };
        assert!(Dataset::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_snapshot_rejects_duplicate_table_external_id() {
        let snapshot = DatasetSnapshot {
            tables: vec![table("p", "t"), table("p", "t")],
            ..Default::default()
        };
        assert!(Dataset::from_snapshot(snapshot).is_err());

        let other_projects = DatasetSnapshot {
            tables: vec![table("p", "t"), table("q", "t")],
            ..Default::default()
        };
        assert!(Dataset::from_snapshot(other_projects).is_ok());
    }

    #[test]
    fn test_verify_cells_catches_bad_value() {
        let mut data = Dataset::new();
        let t = table("p", "t");
        let mut f = field(t.id, "amount", 1);
        f.field_type = FieldType::Number;
        let r = record(t.id);
        data.apply(&Mutation::PutTable(t));
        data.apply(&Mutation::PutField(f.clone()));
        data.apply(&Mutation::PutRecord(r.clone()));
        data.apply(&Mutation::PutCell(cell(r.id, f.id, "abc")));

        assert!(data.verify_cells(&ValueCodec::default()).is_err());
    }
}
