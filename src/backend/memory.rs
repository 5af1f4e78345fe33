//! In-memory backend for tests and embedding

use std::sync::RwLock;

use super::{Backend, ChangeSet, DatasetSnapshot};
use crate::errors::{TableError, TableResult};
use crate::store::Dataset;

/// Keeps committed state in process memory only
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<Dataset>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn load(&self) -> TableResult<DatasetSnapshot> {
        let data = self.data.read().map_err(|_| TableError::poisoned())?;
        Ok(data.to_snapshot())
    }

    fn commit(&self, changes: &ChangeSet) -> TableResult<()> {
        let mut data = self.data.write().map_err(|_| TableError::poisoned())?;
        data.apply_all(changes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Mutation;
    use crate::ids::{ProjectId, TableId};
    use crate::schema::{Table, TableStatus};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_commit_then_load() {
        let backend = MemoryBackend::new();
        let now = Utc::now();
        let table = Table {
            id: TableId(Uuid::new_v4()),
            project_id: ProjectId::new("p"),
            name: "Orders".into(),
            external_id: "orders".into(),
            status: TableStatus::Provisioning,
            created_at: now,
            updated_at: now,
        };

        backend
            .commit(&ChangeSet::from(vec![Mutation::PutTable(table.clone())]))
            .unwrap();

        let snapshot = backend.load().unwrap();
        assert_eq!(snapshot.tables, vec![table]);
    }
}
