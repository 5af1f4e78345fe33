//! Schema registry
//!
//! Owns table and field definitions. Every field change runs inside the
//! table's edit slot; retype and removal are handed to the coordinator,
//! which also owns cell conversion and cascades.

use std::sync::Arc;

use super::naming;
use super::types::{Field, FieldPatch, FieldSpec, FieldType, Table, TableStatus};
use crate::backend::{ChangeSet, Mutation};
use crate::coordinator::{ConsistencyCoordinator, RetypeMode};
use crate::errors::{TableError, TableResult};
use crate::ids::{FieldId, ProjectId, TableId};
use crate::observability::{log_event_with_fields, Event};
use crate::store::{Dataset, StoreState};

/// Table and field definitions
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    state: Arc<StoreState>,
}

impl SchemaRegistry {
    pub(crate) fn new(state: Arc<StoreState>) -> Self {
        Self { state }
    }

    fn coordinator(&self) -> ConsistencyCoordinator {
        ConsistencyCoordinator::new(Arc::clone(&self.state))
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Creates a table in `Provisioning` state.
    pub fn create_table(
        &self,
        project: &ProjectId,
        name: &str,
        external_id: &str,
    ) -> TableResult<Table> {
        let name = naming::normalize_name(name)?;
        naming::validate_external_id(external_id)?;

        let mut data = self.state.write()?;
        if data.find_table(project, external_id).is_some() {
            return Err(TableError::DuplicateExternalId(external_id.to_string()));
        }

        let now = self.state.now();
        let table = Table {
            id: self.state.next_id(),
            project_id: project.clone(),
            name,
            external_id: external_id.to_string(),
            status: TableStatus::Provisioning,
            created_at: now,
            updated_at: now,
        };
        self.state
            .commit(&mut data, ChangeSet::from(vec![Mutation::PutTable(table.clone())]))?;
        drop(data);

        self.state.metrics().increment_tables_created();
        log_event_with_fields(
            Event::TableCreated,
            &[
                ("table", &table.external_id),
                ("project", project.as_str()),
            ],
        );
        Ok(table)
    }

    /// Tables of a project, oldest first.
    pub fn list_tables(&self, project: &ProjectId) -> TableResult<Vec<Table>> {
        let data = self.state.read()?;
        let mut tables: Vec<Table> = data.tables_in_project(project).cloned().collect();
        tables.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(tables)
    }

    pub fn get_table(&self, table_id: TableId) -> TableResult<Table> {
        let data = self.state.read()?;
        table_in(&data, table_id).cloned()
    }

    pub fn find_table(&self, project: &ProjectId, external_id: &str) -> TableResult<Option<Table>> {
        let data = self.state.read()?;
        Ok(data.find_table(project, external_id).cloned())
    }

    pub fn rename_table(&self, table_id: TableId, name: &str) -> TableResult<Table> {
        let name = naming::normalize_name(name)?;
        let _guard = self.state.begin_edit(table_id)?;

        let mut data = self.state.write()?;
        let previous = table_in(&data, table_id)?.clone();
        let table = Table {
            name,
            updated_at: self.state.now(),
            ..previous.clone()
        };
        self.state
            .commit(&mut data, ChangeSet::from(vec![Mutation::PutTable(table.clone())]))?;
        drop(data);

        log_event_with_fields(
            Event::TableRenamed,
            &[
                ("table", &table.external_id),
                ("from", &previous.name),
                ("to", &table.name),
            ],
        );
        Ok(table)
    }

    /// Moves a table to `status`. Setting the current status is a no-op.
    pub fn set_table_status(&self, table_id: TableId, status: TableStatus) -> TableResult<Table> {
        let mut data = self.state.write()?;
        let previous = table_in(&data, table_id)?.clone();

        if previous.status == status {
            return Ok(previous);
        }
        if !previous.status.can_transition_to(status) {
            return Err(TableError::InvalidStatusTransition {
                table: previous.external_id,
                from: previous.status.to_string(),
                to: status.to_string(),
            });
        }

        let table = Table {
            status,
            updated_at: self.state.now(),
            ..previous.clone()
        };
        self.state
            .commit(&mut data, ChangeSet::from(vec![Mutation::PutTable(table.clone())]))?;
        drop(data);

        log_event_with_fields(
            Event::TableStatusChanged,
            &[
                ("table", &table.external_id),
                ("from", previous.status.as_str()),
                ("to", status.as_str()),
            ],
        );
        Ok(table)
    }

    /// Deletes a table with all of its fields, records and cells.
    pub fn delete_table(&self, table_id: TableId) -> TableResult<()> {
        self.coordinator().delete_table(table_id)
    }

    // ========================================================================
    // Fields
    // ========================================================================

    /// Adds a field. Without an explicit order it goes after the last column.
    pub fn add_field(&self, table_id: TableId, spec: FieldSpec) -> TableResult<Field> {
        let name = naming::normalize_name(&spec.name)?;
        let external_id = match spec.external_id {
            Some(external_id) => external_id,
            None => naming::slugify(&name),
        };
        naming::validate_external_id(&external_id)?;
        let display_name = match spec.display_name {
            Some(display_name) => naming::normalize_name(&display_name)?,
            None => name.clone(),
        };
        let field_type = naming::normalize_field_type(spec.field_type)?;

        let _guard = self.state.begin_edit(table_id)?;
        let mut data = self.state.write()?;
        table_in(&data, table_id)?;
        check_unique(&data, table_id, None, &name, &external_id)?;

        let order = match spec.order {
            Some(order) => order,
            None => next_order(&data, table_id)?,
        };

        let now = self.state.now();
        let field = Field {
            id: self.state.next_id(),
            table_id,
            name,
            external_id,
            display_name,
            field_type,
            required: spec.required,
            order,
            created_at: now,
            updated_at: now,
        };
        self.state
            .commit(&mut data, ChangeSet::from(vec![Mutation::PutField(field.clone())]))?;
        drop(data);

        self.state.metrics().increment_fields_added();
        let order_str = field.order.to_string();
        log_event_with_fields(
            Event::FieldAdded,
            &[
                ("field", &field.external_id),
                ("type", field.field_type.type_name()),
                ("order", &order_str),
            ],
        );
        Ok(field)
    }

    pub fn get_field(&self, field_id: FieldId) -> TableResult<Field> {
        let data = self.state.read()?;
        data.field(field_id)
            .cloned()
            .ok_or_else(|| TableError::UnknownField(field_id.to_string()))
    }

    /// Fields of a table in column order.
    pub fn get_schema(&self, table_id: TableId) -> TableResult<Vec<Field>> {
        let data = self.state.read()?;
        table_in(&data, table_id)?;
        Ok(data.fields_of(table_id).into_iter().cloned().collect())
    }

    /// Renames, reorders or flips `required` on a field. The type is changed
    /// only through `retype_field`.
    pub fn update_field(&self, field_id: FieldId, patch: FieldPatch) -> TableResult<Field> {
        let table_id = self.get_field(field_id)?.table_id;
        if patch.is_empty() {
            return self.get_field(field_id);
        }

        let _guard = self.state.begin_edit(table_id)?;
        let mut data = self.state.write()?;
        let previous = data
            .field(field_id)
            .cloned()
            .ok_or_else(|| TableError::UnknownField(field_id.to_string()))?;

        let mut field = previous.clone();
        if let Some(name) = patch.name {
            field.name = naming::normalize_name(&name)?;
        }
        if let Some(external_id) = patch.external_id {
            naming::validate_external_id(&external_id)?;
            field.external_id = external_id;
        }
        if let Some(display_name) = patch.display_name {
            field.display_name = naming::normalize_name(&display_name)?;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        if let Some(order) = patch.order {
            field.order = order;
        }
        check_unique(&data, table_id, Some(field_id), &field.name, &field.external_id)?;

        if field == previous {
            return Ok(previous);
        }
        field.updated_at = self.state.now();
        self.state
            .commit(&mut data, ChangeSet::from(vec![Mutation::PutField(field.clone())]))?;
        drop(data);

        log_event_with_fields(
            Event::FieldUpdated,
            &[("field", &field.external_id), ("previous", &previous.external_id)],
        );
        Ok(field)
    }

    /// Changes a field's type; see [`ConsistencyCoordinator::retype_field`].
    pub fn retype_field(
        &self,
        field_id: FieldId,
        new_type: FieldType,
        mode: RetypeMode,
    ) -> TableResult<Field> {
        self.coordinator()
            .retype_field(field_id, new_type, mode)
            .map(|report| report.field)
    }

    /// Deletes a field and its cells. Irreversible.
    pub fn remove_field(&self, field_id: FieldId) -> TableResult<()> {
        self.coordinator().remove_field(field_id).map(|_| ())
    }
}

/// One past the last column. Fails instead of wrapping when the last
/// column already sits at `i64::MAX`.
fn next_order(data: &Dataset, table_id: TableId) -> TableResult<i64> {
    match data.fields_of(table_id).iter().map(|f| f.order).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| TableError::invalid_value("column order", format!("{} + 1", max))),
    }
}

fn table_in(data: &Dataset, table_id: TableId) -> TableResult<&Table> {
    data.table(table_id)
        .ok_or_else(|| TableError::UnknownTable(table_id.to_string()))
}

/// Field names and external ids are unique within a table.
fn check_unique(
    data: &Dataset,
    table_id: TableId,
    except: Option<FieldId>,
    name: &str,
    external_id: &str,
) -> TableResult<()> {
    for other in data.fields_of(table_id) {
        if Some(other.id) == except {
            continue;
        }
        if other.external_id == external_id {
            return Err(TableError::DuplicateExternalId(external_id.to_string()));
        }
        if other.name == name {
            return Err(TableError::DuplicateExternalId(name.to_string()));
        }
    }
    Ok(())
}
