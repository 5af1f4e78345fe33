//! JSON file backend
//!
//! The whole dataset lives in one file:
//!
//! ```text
//! TABLESTORE/1 <crc32 of body>
//! <JSON body>
//! ```
//!
//! Each commit rewrites the file through a temp file and a rename, so a
//! crash leaves either the old or the new snapshot on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::checksum::{compute_checksum, verify_checksum};
use super::{Backend, ChangeSet, DatasetSnapshot};
use crate::errors::{TableError, TableResult};
use crate::store::Dataset;

const HEADER_PREFIX: &str = "TABLESTORE/1 ";

/// Snapshot-per-commit file backend
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    data: Mutex<Dataset>,
}

impl FileBackend {
    /// File name used inside a data directory
    pub const FILE_NAME: &'static str = "tables.json";

    /// Opens (or starts) the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = read_dataset(&path)?;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Opens `<data_dir>/tables.json`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> TableResult<Self> {
        Self::open(data_dir.as_ref().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current state even if nothing changed.
    pub fn flush(&self) -> TableResult<()> {
        let data = self.data.lock().map_err(|_| TableError::poisoned())?;
        write_dataset(&self.path, &data)
    }
}

impl Backend for FileBackend {
    fn load(&self) -> TableResult<DatasetSnapshot> {
        let data = self.data.lock().map_err(|_| TableError::poisoned())?;
        Ok(data.to_snapshot())
    }

    fn commit(&self, changes: &ChangeSet) -> TableResult<()> {
        let mut data = self.data.lock().map_err(|_| TableError::poisoned())?;
        let mut next = data.clone();
        next.apply_all(changes);

        // Only a change set that reached disk replaces the working copy.
        write_dataset(&self.path, &next)?;
        *data = next;
        Ok(())
    }

    fn close(&self) -> TableResult<()> {
        self.flush()
    }
}

fn read_dataset(path: &Path) -> TableResult<Dataset> {
    if !path.exists() {
        return Ok(Dataset::new());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        TableError::Storage(format!("Failed to read {}: {}", path.display(), e))
    })?;

    if content.is_empty() {
        return Ok(Dataset::new());
    }

    let (header, body) = content.split_once('\n').ok_or_else(|| {
        TableError::Storage(format!("Missing header in {}", path.display()))
    })?;

    let expected: u32 = header
        .strip_prefix(HEADER_PREFIX)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| TableError::Storage(format!("Malformed header in {}", path.display())))?;

    if !verify_checksum(body.as_bytes(), expected) {
        return Err(TableError::Storage(format!(
            "Checksum mismatch in {}",
            path.display()
        )));
    }

    let snapshot: DatasetSnapshot = serde_json::from_str(body).map_err(|e| {
        TableError::Storage(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    Dataset::from_snapshot(snapshot)
}

fn write_dataset(path: &Path, data: &Dataset) -> TableResult<()> {
    let body = serde_json::to_string(&data.to_snapshot())
        .map_err(|e| TableError::Storage(format!("Failed to serialize dataset: {}", e)))?;
    let content = format!("{}{}\n{}", HEADER_PREFIX, compute_checksum(body.as_bytes()), body);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            TableError::Storage(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)
        .map_err(|e| TableError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path)
        .map_err(|e| TableError::Storage(format!("Failed to replace {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Mutation;
    use crate::ids::{ProjectId, TableId};
    use crate::schema::{Table, TableStatus};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_table() -> Table {
        let now = Utc::now();
        Table {
            id: TableId(Uuid::new_v4()),
            project_id: ProjectId::new("p"),
            name: "Orders".into(),
            external_id: "orders".into(),
            status: TableStatus::Ready,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path()).unwrap();
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_commit_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let table = sample_table();

        {
            let backend = FileBackend::in_dir(tmp.path()).unwrap();
            backend
                .commit(&ChangeSet::from(vec![Mutation::PutTable(table.clone())]))
                .unwrap();
        }

        let reopened = FileBackend::in_dir(tmp.path()).unwrap();
        assert_eq!(reopened.load().unwrap().tables, vec![table]);
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path()).unwrap();
        backend
            .commit(&ChangeSet::from(vec![Mutation::PutTable(sample_table())]))
            .unwrap();

        let path = backend.path().to_path_buf();
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("Orders", "Ordens")).unwrap();

        assert!(matches!(
            FileBackend::open(&path),
            Err(TableError::Storage(_))
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(FileBackend::FILE_NAME);
        fs::write(&path, "not a header\n{}").unwrap();
        assert!(FileBackend::open(&path).is_err());
    }

    #[test]
    fn test_failed_write_is_not_kept() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path()).unwrap();

        // A directory where the temp file goes makes the next write fail.
        let blocker = backend.path().with_extension("json.tmp");
        fs::create_dir(&blocker).unwrap();
        let rejected = sample_table();
        assert!(backend
            .commit(&ChangeSet::from(vec![Mutation::PutTable(rejected.clone())]))
            .is_err());
        assert!(backend.load().unwrap().tables.is_empty());

        fs::remove_dir(&blocker).unwrap();
        let accepted = Table {
            external_id: "accepted".into(),
            ..sample_table()
        };
        backend
            .commit(&ChangeSet::from(vec![Mutation::PutTable(accepted.clone())]))
            .unwrap();

        let reopened = FileBackend::in_dir(tmp.path()).unwrap();
        assert_eq!(reopened.load().unwrap().tables, vec![accepted]);
    }

    #[test]
    fn test_flush_creates_file() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path().join("nested")).unwrap();
        backend.close().unwrap();
        assert!(backend.path().exists());
    }
}
