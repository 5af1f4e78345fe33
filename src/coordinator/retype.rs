//! Retype planning
//!
//! A plan is the full list of cell rewrites and failures for one field.
//! Nothing is written while planning; the coordinator turns the plan into a
//! single change set.

use serde::Serialize;

use crate::backend::{ChangeSet, Mutation};
use crate::codec::ValueCodec;
use crate::errors::TableError;
use crate::ids::CellId;
use crate::records::Cell;
use crate::schema::{Field, FieldType};
use crate::store::Dataset;

/// What to do with cells that cannot be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetypeMode {
    /// Reject the retype if any cell fails to convert
    #[default]
    Strict,
    /// Delete the cells that fail to convert
    Destructive,
}

/// Outcome of a committed retype
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetypeReport {
    pub field: Field,
    /// Cells whose stored value changed
    pub rewritten: usize,
    /// Cells deleted because they did not convert
    pub purged: usize,
}

#[derive(Debug, Default)]
pub(crate) struct RetypePlan {
    pub rewrites: Vec<Cell>,
    pub failures: Vec<(CellId, TableError)>,
}

impl RetypePlan {
    /// Converts every cell of `field` to `new_type`, oldest cell first.
    pub fn build(
        codec: &ValueCodec,
        data: &Dataset,
        field: &Field,
        new_type: &FieldType,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let mut plan = RetypePlan::default();
        for cell in data.cells_of_field(field.id) {
            match codec.convert(&field.field_type, &cell.value, new_type) {
                Ok(value) if value == cell.value => {}
                Ok(value) => plan.rewrites.push(Cell {
                    value,
                    updated_at: now,
                    ..cell.clone()
                }),
                Err(e) => plan.failures.push((cell.id, e)),
            }
        }
        plan
    }

    /// The error a strict retype reports, naming the first failing cell.
    pub fn rejection(&self, field: &Field) -> Option<TableError> {
        self.failures
            .first()
            .map(|(cell, reason)| TableError::IncompatibleRetype {
                field: field.external_id.clone(),
                cell: cell.to_string(),
                reason: reason.to_string(),
            })
    }

    /// Field update, rewrites and (destructive) purges as one change set.
    pub fn into_changes(self, retyped: Field, mode: RetypeMode) -> (ChangeSet, usize, usize) {
        let rewritten = self.rewrites.len();
        let mut changes = ChangeSet::new();
        changes.push(Mutation::PutField(retyped));
        for cell in self.rewrites {
            changes.push(Mutation::PutCell(cell));
        }
        let mut purged = 0;
        if mode == RetypeMode::Destructive {
            for (cell, _) in self.failures {
                changes.push(Mutation::DeleteCell(cell));
                purged += 1;
            }
        }
        (changes, rewritten, purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FieldId, ProjectId, RecordId, TableId};
    use crate::records::Record;
    use crate::schema::{Table, TableStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn dataset_with(values: &[&str], field_type: FieldType) -> (Dataset, Field) {
        let now = Utc::now();
        let table = Table {
            id: TableId(Uuid::new_v4()),
            project_id: ProjectId::new("p"),
            name: "t".into(),
            external_id: "t".into(),
            status: TableStatus::Ready,
            created_at: now,
            updated_at: now,
        };
        let field = Field {
            id: FieldId(Uuid::new_v4()),
            table_id: table.id,
            name: "v".into(),
            external_id: "v".into(),
            display_name: "v".into(),
            field_type,
            required: false,
            order: 1,
            created_at: now,
            updated_at: now,
        };
        let mut data = Dataset::new();
        data.apply(&Mutation::PutTable(table.clone()));
        data.apply(&Mutation::PutField(field.clone()));
        for value in values {
            let record = Record {
                id: RecordId(Uuid::new_v4()),
                table_id: table.id,
                created_at: now,
                updated_at: now,
            };
            data.apply(&Mutation::PutRecord(record.clone()));
            data.apply(&Mutation::PutCell(Cell {
                id: CellId(Uuid::new_v4()),
                record_id: record.id,
                field_id: field.id,
                value: value.to_string(),
                created_at: now,
                updated_at: now,
            }));
        }
        (data, field)
    }

    #[test]
    fn test_number_to_text_keeps_digits() {
        let (data, field) = dataset_with(&["42.50"], FieldType::Number);
        let plan = RetypePlan::build(
            &ValueCodec::default(),
            &data,
            &field,
            &FieldType::ShortText,
            Utc::now(),
        );
        assert!(plan.failures.is_empty());
        // Same stored string, nothing to rewrite.
        assert!(plan.rewrites.is_empty());
    }

    #[test]
    fn test_text_to_number_fails_on_words() {
        let (data, field) = dataset_with(&["12", "abc"], FieldType::ShortText);
        let plan = RetypePlan::build(
            &ValueCodec::default(),
            &data,
            &field,
            &FieldType::Number,
            Utc::now(),
        );
        assert_eq!(plan.failures.len(), 1);
        assert!(matches!(
            plan.rejection(&field),
            Some(TableError::IncompatibleRetype { .. })
        ));
    }

    #[test]
    fn test_destructive_changes_purge_failures() {
        let (data, field) = dataset_with(&["yes", "maybe"], FieldType::ShortText);
        let plan = RetypePlan::build(
            &ValueCodec::default(),
            &data,
            &field,
            &FieldType::Boolean,
            Utc::now(),
        );
        let retyped = Field {
            field_type: FieldType::Boolean,
            ..field
        };
        let (changes, rewritten, purged) = plan.into_changes(retyped, RetypeMode::Destructive);
        assert_eq!(rewritten, 1);
        assert_eq!(purged, 1);
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn test_strict_changes_keep_failures() {
        let (data, field) = dataset_with(&["maybe"], FieldType::ShortText);
        let plan = RetypePlan::build(
            &ValueCodec::default(),
            &data,
            &field,
            &FieldType::Boolean,
            Utc::now(),
        );
        let (changes, _, purged) = plan.into_changes(field, RetypeMode::Strict);
        assert_eq!(purged, 0);
        assert_eq!(changes.len(), 1);
    }
}
