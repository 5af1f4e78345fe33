//! CLI command implementations
//!
//! Every command loads the configuration, opens the file store, does one
//! thing and closes the store again. Output is a single JSON object.

use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};
use crate::backend::{Backend, FileBackend};
use crate::config::StoreConfig;
use crate::errors::TableError;
use crate::ids::ProjectId;
use crate::loader::demo;
use crate::records::RecordView;
use crate::schema::Table;
use crate::store::TableStore;

/// Main CLI entry point
///
/// Parses arguments, dispatches, and reports failures as a JSON error
/// object before handing them back to `main`.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    match run_command(cli.command) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = write_error(e.code_str(), e.message());
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let data = match cmd {
        Command::Init { config } => init(&config)?,
        Command::Seed { config, project } => seed(&config, &project)?,
        Command::Cleanup { config, project } => cleanup(&config, &project)?,
        Command::Tables { config, project } => tables(&config, &project)?,
        Command::Schema {
            config,
            project,
            table,
        } => schema(&config, &project, &table)?,
        Command::Rows {
            config,
            project,
            table,
        } => rows(&config, &project, &table)?,
    };
    write_response(data)
}

/// Creates the data directory and an empty store file.
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = StoreConfig::load(config_path)?;
    let path = config.data_dir.join(FileBackend::FILE_NAME);

    if path.exists() {
        return Err(CliError::already_initialized());
    }

    fs::create_dir_all(&config.data_dir).map_err(|e| {
        CliError::io_error(format!(
            "Failed to create directory {}: {}",
            config.data_dir.display(),
            e
        ))
    })?;
    FileBackend::open(&path)?.close()?;

    Ok(json!({"initialized": true, "path": path.display().to_string()}))
}

/// Loads the ERP demo catalog into `project`.
pub fn seed(config_path: &Path, project: &str) -> CliResult<Value> {
    let store = open_store(config_path)?;
    let catalog = demo::erp_catalog();
    let report = store
        .loader()
        .seed(&ProjectId::new(project), &catalog.tables, &catalog.rows);
    store.close()?;
    Ok(serde_json::to_value(report)?)
}

/// Removes the ERP demo catalog tables from `project`.
pub fn cleanup(config_path: &Path, project: &str) -> CliResult<Value> {
    let store = open_store(config_path)?;
    let catalog = demo::erp_catalog();
    let report = store
        .loader()
        .cleanup(&ProjectId::new(project), &catalog.tables);
    store.close()?;
    Ok(serde_json::to_value(report)?)
}

/// Lists the tables of `project`.
pub fn tables(config_path: &Path, project: &str) -> CliResult<Value> {
    let store = open_store(config_path)?;
    let tables = store.schema().list_tables(&ProjectId::new(project))?;
    store.close()?;
    Ok(serde_json::to_value(tables)?)
}

/// Prints a table and its fields in column order.
pub fn schema(config_path: &Path, project: &str, table: &str) -> CliResult<Value> {
    let store = open_store(config_path)?;
    let found = find_table(&store, project, table)?;
    let fields = store.schema().get_schema(found.id)?;
    store.close()?;
    Ok(json!({
        "table": serde_json::to_value(found)?,
        "fields": serde_json::to_value(fields)?,
    }))
}

/// Prints the decoded records of a table, oldest first.
pub fn rows(config_path: &Path, project: &str, table: &str) -> CliResult<Value> {
    let store = open_store(config_path)?;
    let found = find_table(&store, project, table)?;
    let views = store.records().list_records(found.id)?;
    store.close()?;
    Ok(Value::Array(views.iter().map(record_json).collect()))
}

fn open_store(config_path: &Path) -> CliResult<TableStore> {
    let config = StoreConfig::load(config_path)?;
    if !config.data_dir.join(FileBackend::FILE_NAME).exists() {
        return Err(CliError::not_initialized());
    }
    Ok(TableStore::open_dir(&config)?)
}

fn find_table(store: &TableStore, project: &str, external_id: &str) -> CliResult<Table> {
    store
        .schema()
        .find_table(&ProjectId::new(project), external_id)?
        .ok_or_else(|| CliError::from(TableError::UnknownTable(external_id.to_string())))
}

/// Plain JSON values instead of the tagged logical form.
fn record_json(view: &RecordView) -> Value {
    let values: Map<String, Value> = view
        .values
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    json!({
        "id": view.id.to_string(),
        "created_at": view.created_at,
        "updated_at": view.updated_at,
        "values": values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path) -> std::path::PathBuf {
        let config_path = dir.join("tablestore.json");
        let config = json!({
            "data_dir": dir.join("data"),
            "log_level": "ERROR",
        });
        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_commands_require_init() {
        let tmp = TempDir::new().unwrap();
        let config = write_config(tmp.path());

        let err = tables(&config, "default").unwrap_err();
        assert_eq!(err.code_str(), "TABLES_CLI_NOT_INITIALIZED");
    }

    #[test]
    fn test_init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        let config = write_config(tmp.path());

        init(&config).unwrap();
        let err = init(&config).unwrap_err();
        assert_eq!(err.code_str(), "TABLES_CLI_ALREADY_INITIALIZED");
    }

    #[test]
    fn test_seed_then_read_back() {
        let tmp = TempDir::new().unwrap();
        let config = write_config(tmp.path());
        init(&config).unwrap();

        let report = seed(&config, "acme").unwrap();
        assert_eq!(report["created"].as_array().unwrap().len(), 3);

        let listed = tables(&config, "acme").unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 3);

        let fields = schema(&config, "acme", demo::STOCK).unwrap();
        assert_eq!(fields["fields"][0]["external_id"], "material_code");

        let stock = rows(&config, "acme", demo::STOCK).unwrap();
        let first = &stock.as_array().unwrap()[0];
        assert_eq!(first["values"]["material_code"], "MAT001");
        assert_eq!(first["values"]["quantity"], json!(1500));

        let again = seed(&config, "acme").unwrap();
        assert_eq!(again["skipped"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_cleanup_then_unknown_table() {
        let tmp = TempDir::new().unwrap();
        let config = write_config(tmp.path());
        init(&config).unwrap();
        seed(&config, "acme").unwrap();

        let report = cleanup(&config, "acme").unwrap();
        assert_eq!(report["removed"].as_array().unwrap().len(), 3);

        let err = rows(&config, "acme", demo::STOCK).unwrap_err();
        assert_eq!(err.code_str(), "TABLES_UNKNOWN_TABLE");
    }
}
