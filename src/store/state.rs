//! State shared by the registry, record store, coordinator and loader

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::dataset::Dataset;
use crate::backend::{Backend, ChangeSet};
use crate::codec::ValueCodec;
use crate::coordinator::{EditGuard, EditLocks};
use crate::errors::{TableError, TableResult};
use crate::ids::{IdGenerator, TableId};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// One open store.
///
/// Lock order is always edit lock first, then the dataset lock.
#[derive(Debug)]
pub(crate) struct StoreState {
    backend: Arc<dyn Backend>,
    data: RwLock<Dataset>,
    codec: ValueCodec,
    locks: EditLocks,
    metrics: MetricsRegistry,
    ids: Arc<dyn IdGenerator>,
    edit_timeout: Duration,
    clock: Mutex<DateTime<Utc>>,
}

impl StoreState {
    pub(crate) fn new(
        backend: Arc<dyn Backend>,
        data: Dataset,
        codec: ValueCodec,
        ids: Arc<dyn IdGenerator>,
        edit_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            data: RwLock::new(data),
            codec,
            locks: EditLocks::new(),
            metrics: MetricsRegistry::new(),
            ids,
            edit_timeout,
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub(crate) fn read(&self) -> TableResult<RwLockReadGuard<'_, Dataset>> {
        self.data.read().map_err(|_| TableError::poisoned())
    }

    pub(crate) fn write(&self) -> TableResult<RwLockWriteGuard<'_, Dataset>> {
        self.data.write().map_err(|_| TableError::poisoned())
    }

    /// Persists `changes`, then makes them visible. The caller holds the
    /// dataset write lock, so readers see all of the change set or none.
    pub(crate) fn commit(&self, data: &mut Dataset, changes: ChangeSet) -> TableResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.backend.commit(&changes)?;
        data.apply_all(&changes);
        Ok(())
    }

    /// Marks the table busy for a schema edit.
    pub(crate) fn begin_edit(&self, table: TableId) -> TableResult<EditGuard<'_>> {
        self.locks
            .acquire(table, self.edit_timeout)
            .map_err(|err| {
                if let TableError::SchemaEditConflict(_) = err {
                    self.metrics.increment_schema_edit_conflicts();
                    let table = table.to_string();
                    let waited = self.edit_timeout.as_millis().to_string();
                    log_event_with_fields(
                        Event::SchemaEditConflict,
                        &[("table", &table), ("waited_ms", &waited)],
                    );
                }
                err
            })
    }

    pub(crate) fn locks(&self) -> &EditLocks {
        &self.locks
    }

    pub(crate) fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    pub(crate) fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub(crate) fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub(crate) fn next_id<T: From<Uuid>>(&self) -> T {
        T::from(self.ids.next_uuid())
    }

    /// Wall clock, nudged forward so successive calls never repeat. Creation
    /// order of records and fields depends on it.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = match self.clock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = if now > *last {
            now
        } else {
            *last + chrono::Duration::nanoseconds(1)
        };
        *last = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::ids::RandomIds;

    fn state() -> StoreState {
        StoreState::new(
            Arc::new(MemoryBackend::new()),
            Dataset::new(),
            ValueCodec::default(),
            Arc::new(RandomIds),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_now_strictly_increases() {
        let state = state();
        let mut previous = state.now();
        for _ in 0..1000 {
            let next = state.now();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_empty_commit_is_noop() {
        let state = state();
        let mut data = state.write().unwrap();
        state.commit(&mut data, ChangeSet::new()).unwrap();
        assert_eq!(data.cell_count(), 0);
    }

    #[test]
    fn test_conflict_is_counted() {
        let state = state();
        let table = TableId(Uuid::new_v4());
        let _guard = state.begin_edit(table).unwrap();
        assert!(state.begin_edit(table).is_err());
        assert_eq!(state.metrics().snapshot().schema_edit_conflicts, 1);
    }
}
