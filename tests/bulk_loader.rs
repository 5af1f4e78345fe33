//! Bulk Loader Tests
//!
//! Seeding is re-runnable: tables that exist are skipped, a failing table
//! leaves nothing behind, and the other tables are unaffected.

use tablestore::codec::LogicalValue;
use tablestore::ids::ProjectId;
use tablestore::loader::{demo, CancelToken, SampleRows, TableSpec};
use tablestore::records::RowValues;
use tablestore::schema::{FieldSpec, FieldType, TableStatus};
use tablestore::store::TableStore;

// =============================================================================
// Helpers
// =============================================================================

fn row(pairs: &[(&str, LogicalValue)]) -> RowValues {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn specs() -> Vec<TableSpec> {
    vec![
        TableSpec::new("colors", "Colors")
            .field(FieldSpec::new("name", FieldType::ShortText))
            .field(FieldSpec::new("hex", FieldType::ShortText)),
        TableSpec::new("sizes", "Sizes")
            .field(FieldSpec::new("label", FieldType::ShortText))
            .field(FieldSpec::new("width", FieldType::Number)),
    ]
}

fn sample_rows(width: &str) -> SampleRows {
    let mut rows = SampleRows::new();
    rows.insert(
        "colors".to_string(),
        vec![
            row(&[("name", "red".into()), ("hex", "#f00".into())]),
            row(&[("name", "blue".into()), ("hex", "#00f".into())]),
        ],
    );
    rows.insert(
        "sizes".to_string(),
        vec![
            row(&[("label", "S".into()), ("width", "10".into())]),
            row(&[("label", "M".into()), ("width", width.into())]),
        ],
    );
    rows
}

// =============================================================================
// IDEMPOTENCE
// =============================================================================

/// Test: Seeding twice creates nothing the second time.
#[test]
fn test_seed_is_idempotent() {
    let store = TableStore::in_memory();
    let project = ProjectId::new("shop");
    let loader = store.loader();

    let first = loader.seed(&project, &specs(), &sample_rows("20"));
    assert_eq!(first.created.len(), 2);
    assert!(first.failed.is_empty());

    let second = loader.seed(&project, &specs(), &sample_rows("20"));
    assert!(second.created.is_empty());
    assert_eq!(second.skipped, vec!["colors".to_string(), "sizes".to_string()]);

    let tables = store.schema().list_tables(&project).unwrap();
    assert_eq!(tables.len(), 2);
    for table in tables {
        assert_eq!(table.status, TableStatus::Ready);
        assert_eq!(store.records().count_records(table.id).unwrap(), 2);
    }
}

/// Test: The demo catalog seeds into separate projects independently.
#[test]
fn test_demo_catalog_per_project() {
    let store = TableStore::in_memory();
    let catalog = demo::erp_catalog();

    for name in ["north", "south"] {
        let report = store
            .loader()
            .seed(&ProjectId::new(name), &catalog.tables, &catalog.rows);
        assert_eq!(report.created.len(), 3);
    }
    assert_eq!(store.metrics().tables_created, 6);
}

// =============================================================================
// FAILURE ISOLATION
// =============================================================================

/// Test: A bad row fails only its own table, which is removed again.
#[test]
fn test_failed_table_is_isolated() {
    let store = TableStore::in_memory();
    let project = ProjectId::new("shop");

    let report = store
        .loader()
        .seed(&project, &specs(), &sample_rows("wide"));
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].external_id, "colors");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].external_id, "sizes");
    assert_eq!(report.failed[0].code, "TABLES_INVALID_VALUE");

    let schema = store.schema();
    assert!(schema.find_table(&project, "sizes").unwrap().is_none());

    // Fixed data on a re-run fills in only the missing table.
    let rerun = store.loader().seed(&project, &specs(), &sample_rows("20"));
    assert_eq!(rerun.skipped, vec!["colors".to_string()]);
    assert_eq!(rerun.created.len(), 1);
    assert_eq!(rerun.created[0].records, 2);
}

/// Test: Unknown sample columns are dropped and reported.
#[test]
fn test_unknown_columns_are_reported() {
    let store = TableStore::in_memory();
    let project = ProjectId::new("shop");
    let mut rows = sample_rows("20");
    rows.get_mut("colors")
        .unwrap()
        .push(row(&[("name", "green".into()), ("shade", "dark".into())]));

    let report = store.loader().seed(&project, &specs(), &rows);
    let colors = &report.created[0];
    assert_eq!(colors.records, 3);
    assert_eq!(colors.ignored_columns, vec!["shade".to_string()]);
}

// =============================================================================
// CANCELLATION AND CLEANUP
// =============================================================================

/// Test: A cancelled seed stops before the next table.
#[test]
fn test_cancelled_seed_stops() {
    let store = TableStore::in_memory();
    let project = ProjectId::new("shop");
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = store
        .loader()
        .seed_until(&project, &specs(), &sample_rows("20"), &cancel);
    assert!(report.cancelled);
    assert!(report.created.is_empty());
    assert!(store.schema().list_tables(&project).unwrap().is_empty());
}

/// Test: Cleanup removes seeded tables and reports the rest as missing.
#[test]
fn test_cleanup_removes_seeded_tables() {
    let store = TableStore::in_memory();
    let project = ProjectId::new("shop");
    store.loader().seed(&project, &specs()[..1], &sample_rows("20"));

    let report = store.loader().cleanup(&project, &specs());
    assert_eq!(report.removed, vec!["colors".to_string()]);
    assert_eq!(report.missing, vec!["sizes".to_string()]);
    assert!(report.failed.is_empty());

    assert!(store.schema().list_tables(&project).unwrap().is_empty());
    assert_eq!(store.metrics().tables_deleted, 1);
}
