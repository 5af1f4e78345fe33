//! Idempotent seeding and cleanup
//!
//! Each table is one unit: created with its fields and rows, then marked
//! `Ready`. A table that already exists is left alone. A table that fails
//! part way is removed again so the next run starts clean. Failures are
//! logged and reported; they never stop the remaining tables.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{TableError, TableResult};
use crate::ids::{ProjectId, TableId};
use crate::observability::{log_event_with_fields, Event, Timer};
use crate::records::{RecordStore, RowValues};
use crate::schema::{FieldSpec, SchemaRegistry, Table, TableStatus};

/// Definition of one table to seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub external_id: String,
    pub name: String,
    /// Created in this order
    pub fields: Vec<FieldSpec>,
}

impl TableSpec {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }
}

/// Sample rows keyed by table external id
pub type SampleRows = BTreeMap<String, Vec<RowValues>>;

/// Cooperative cancellation, checked between tables
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeededTable {
    pub external_id: String,
    pub table_id: TableId,
    pub fields: usize,
    pub records: usize,
    /// Sample row keys that matched no field
    pub ignored_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFailure {
    pub external_id: String,
    pub code: String,
    pub message: String,
}

impl TableFailure {
    fn new(external_id: &str, err: &TableError) -> Self {
        Self {
            external_id: external_id.to_string(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub created: Vec<SeededTable>,
    pub skipped: Vec<String>,
    pub failed: Vec<TableFailure>,
    /// Tables after the cancellation point were not attempted
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    /// Not present, nothing to do
    pub missing: Vec<String>,
    pub failed: Vec<TableFailure>,
    pub cancelled: bool,
}

/// Seeds and removes whole tables
#[derive(Debug, Clone)]
pub struct BulkLoader {
    schema: SchemaRegistry,
    records: RecordStore,
}

impl BulkLoader {
    pub fn new(schema: SchemaRegistry, records: RecordStore) -> Self {
        Self { schema, records }
    }

    /// Creates every table in `specs` that does not exist yet.
    pub fn seed(&self, project: &ProjectId, specs: &[TableSpec], rows: &SampleRows) -> SeedReport {
        self.seed_until(project, specs, rows, &CancelToken::new())
    }

    /// Like [`seed`](Self::seed), stopping before the next table once
    /// `cancel` fires. Tables already handled stay committed.
    pub fn seed_until(
        &self,
        project: &ProjectId,
        specs: &[TableSpec],
        rows: &SampleRows,
        cancel: &CancelToken,
    ) -> SeedReport {
        let timer = Timer::new();
        let table_count = specs.len().to_string();
        log_event_with_fields(
            Event::SeedBegin,
            &[("project", project.as_str()), ("tables", &table_count)],
        );

        let mut report = SeedReport::default();
        for (index, spec) in specs.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                let remaining = (specs.len() - index).to_string();
                log_event_with_fields(
                    Event::SeedCancelled,
                    &[("project", project.as_str()), ("remaining", &remaining)],
                );
                break;
            }

            match self.schema.find_table(project, &spec.external_id) {
                Ok(Some(_)) => {
                    log_event_with_fields(
                        Event::SeedTableSkipped,
                        &[("table", &spec.external_id), ("reason", "already exists")],
                    );
                    report.skipped.push(spec.external_id.clone());
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    self.record_seed_failure(&mut report, spec, &err);
                    continue;
                }
            }

            let table_rows = rows
                .get(&spec.external_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            match self.load_table(project, spec, table_rows) {
                Ok(seeded) => {
                    let fields = seeded.fields.to_string();
                    let records = seeded.records.to_string();
                    let ignored = seeded.ignored_columns.join(",");
                    log_event_with_fields(
                        Event::SeedTableCreated,
                        &[
                            ("table", &spec.external_id),
                            ("fields", &fields),
                            ("records", &records),
                            ("ignored_columns", &ignored),
                        ],
                    );
                    report.created.push(seeded);
                }
                Err(err) => self.record_seed_failure(&mut report, spec, &err),
            }
        }

        let created = report.created.len().to_string();
        let skipped = report.skipped.len().to_string();
        let failed = report.failed.len().to_string();
        log_event_with_fields(
            Event::SeedComplete,
            &[
                ("project", project.as_str()),
                ("created", &created),
                ("skipped", &skipped),
                ("failed", &failed),
                ("duration_ms", &timer.elapsed_ms()),
            ],
        );
        report
    }

    /// Deletes every table in `specs` that exists.
    pub fn cleanup(&self, project: &ProjectId, specs: &[TableSpec]) -> CleanupReport {
        self.cleanup_until(project, specs, &CancelToken::new())
    }

    pub fn cleanup_until(
        &self,
        project: &ProjectId,
        specs: &[TableSpec],
        cancel: &CancelToken,
    ) -> CleanupReport {
        let mut report = CleanupReport::default();
        for spec in specs {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let outcome = self
                .schema
                .find_table(project, &spec.external_id)
                .and_then(|found| match found {
                    Some(table) => self.schema.delete_table(table.id).map(|_| true),
                    None => Ok(false),
                });

            match outcome {
                Ok(true) => {
                    log_event_with_fields(
                        Event::CleanupTableRemoved,
                        &[("table", &spec.external_id), ("project", project.as_str())],
                    );
                    report.removed.push(spec.external_id.clone());
                }
                Ok(false) => report.missing.push(spec.external_id.clone()),
                Err(err) => {
                    let reason = err.to_string();
                    log_event_with_fields(
                        Event::CleanupTableFailed,
                        &[("table", &spec.external_id), ("reason", &reason)],
                    );
                    report.failed.push(TableFailure::new(&spec.external_id, &err));
                }
            }
        }
        report
    }

    fn load_table(
        &self,
        project: &ProjectId,
        spec: &TableSpec,
        rows: &[RowValues],
    ) -> TableResult<SeededTable> {
        let table = self
            .schema
            .create_table(project, &spec.name, &spec.external_id)?;

        self.populate(&table, spec, rows).map_err(|err| {
            // Best effort; the failure being reported is the original one.
            if let Err(discard) = self.schema.delete_table(table.id) {
                let reason = discard.to_string();
                log_event_with_fields(
                    Event::CleanupTableFailed,
                    &[("table", &spec.external_id), ("reason", &reason)],
                );
            }
            err
        })
    }

    fn populate(&self, table: &Table, spec: &TableSpec, rows: &[RowValues]) -> TableResult<SeededTable> {
        let mut known = HashSet::new();
        for field_spec in &spec.fields {
            let field = self.schema.add_field(table.id, field_spec.clone())?;
            known.insert(field.external_id);
        }

        let mut ignored = BTreeSet::new();
        let mut filtered = Vec::with_capacity(rows.len());
        for row in rows {
            let mut kept = RowValues::new();
            for (key, value) in row {
                if known.contains(key) {
                    kept.insert(key.clone(), value.clone());
                } else {
                    ignored.insert(key.clone());
                }
            }
            filtered.push(kept);
        }

        let records = self.records.write_record_batch(table.id, &filtered)?;
        self.schema.set_table_status(table.id, TableStatus::Ready)?;

        Ok(SeededTable {
            external_id: table.external_id.clone(),
            table_id: table.id,
            fields: known.len(),
            records: records.len(),
            ignored_columns: ignored.into_iter().collect(),
        })
    }

    fn record_seed_failure(&self, report: &mut SeedReport, spec: &TableSpec, err: &TableError) {
        let reason = err.to_string();
        log_event_with_fields(
            Event::SeedTableFailed,
            &[
                ("table", &spec.external_id),
                ("code", err.code()),
                ("reason", &reason),
            ],
        );
        report.failed.push(TableFailure::new(&spec.external_id, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LogicalValue;
    use crate::schema::FieldType;
    use crate::store::TableStore;

    fn project() -> ProjectId {
        ProjectId::new("demo")
    }

    fn specs() -> Vec<TableSpec> {
        vec![
            TableSpec::new("stock", "Stock")
                .field(FieldSpec::new("code", FieldType::ShortText))
                .field(FieldSpec::new("qty", FieldType::Number)),
            TableSpec::new("notes", "Notes").field(FieldSpec::new("body", FieldType::LongText)),
        ]
    }

    fn rows() -> SampleRows {
        let mut rows = SampleRows::new();
        rows.insert(
            "stock".into(),
            vec![
                [
                    ("code".to_string(), LogicalValue::text("A1")),
                    ("qty".to_string(), LogicalValue::from(5i64)),
                    ("colour".to_string(), LogicalValue::text("red")),
                ]
                .into_iter()
                .collect(),
            ],
        );
        rows
    }

    #[test]
    fn test_seed_creates_tables_ready() {
        let store = TableStore::in_memory();
        let report = store.loader().seed(&project(), &specs(), &rows());

        assert_eq!(report.created.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(report.created[0].records, 1);
        assert_eq!(report.created[0].ignored_columns, ["colour"]);

        let stock = store
            .schema()
            .find_table(&project(), "stock")
            .unwrap()
            .unwrap();
        assert_eq!(stock.status, TableStatus::Ready);
    }

    #[test]
    fn test_seed_twice_skips() {
        let store = TableStore::in_memory();
        let loader = store.loader();
        loader.seed(&project(), &specs(), &rows());
        let second = loader.seed(&project(), &specs(), &rows());

        assert!(second.created.is_empty());
        assert_eq!(second.skipped, ["stock", "notes"]);
        assert_eq!(store.schema().list_tables(&project()).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_table_is_removed_and_others_continue() {
        let store = TableStore::in_memory();
        let mut specs = specs();
        specs.insert(
            0,
            TableSpec::new("broken", "Broken").field(FieldSpec::new("n", FieldType::Number)),
        );
        let mut rows = rows();
        rows.insert(
            "broken".into(),
            vec![[("n".to_string(), LogicalValue::text("lots"))]
                .into_iter()
                .collect()],
        );

        let report = store.loader().seed(&project(), &specs, &rows);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].external_id, "broken");
        assert_eq!(report.failed[0].code, "TABLES_INVALID_VALUE");
        assert_eq!(report.created.len(), 2);
        assert!(store
            .schema()
            .find_table(&project(), "broken")
            .unwrap()
            .is_none());

        // A later run with fixed data creates it.
        rows.insert(
            "broken".into(),
            vec![[("n".to_string(), LogicalValue::from(3i64))]
                .into_iter()
                .collect()],
        );
        let rerun = store.loader().seed(&project(), &specs, &rows);
        assert_eq!(rerun.created.len(), 1);
        assert_eq!(rerun.skipped, ["stock", "notes"]);
    }

    #[test]
    fn test_cancelled_seed_stops_before_next_table() {
        let store = TableStore::in_memory();
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = store
            .loader()
            .seed_until(&project(), &specs(), &rows(), &cancel);
        assert!(report.cancelled);
        assert!(report.created.is_empty());
    }

    #[test]
    fn test_cleanup_removes_and_reports_missing() {
        let store = TableStore::in_memory();
        let loader = store.loader();
        loader.seed(&project(), &specs()[..1], &rows());

        let report = loader.cleanup(&project(), &specs());
        assert_eq!(report.removed, ["stock"]);
        assert_eq!(report.missing, ["notes"]);
        assert!(store.schema().list_tables(&project()).unwrap().is_empty());
    }
}
