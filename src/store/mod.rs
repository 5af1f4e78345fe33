//! # Table Store
//!
//! Entry point that wires the backend, the in-memory dataset and the four
//! components together.
//!
//! ```ignore
//! let store = TableStore::in_memory();
//! let table = store.schema().create_table(&project, "Orders", "orders")?;
//! ```
//!
//! The backend is opened by the caller and handed over; `close` flushes and
//! releases it. Components are cheap handles over the same shared state.

mod dataset;
mod state;

pub use dataset::Dataset;
pub(crate) use state::StoreState;

use std::sync::Arc;

use crate::backend::{Backend, FileBackend, MemoryBackend};
use crate::config::StoreConfig;
use crate::coordinator::ConsistencyCoordinator;
use crate::errors::TableResult;
use crate::ids::{IdGenerator, RandomIds};
use crate::loader::BulkLoader;
use crate::observability::{log_event_with_fields, Event, Logger, MetricsSnapshot};
use crate::records::RecordStore;
use crate::schema::SchemaRegistry;

/// An open table store
#[derive(Debug, Clone)]
pub struct TableStore {
    state: Arc<StoreState>,
}

impl TableStore {
    /// Opens a store over `backend` with random ids.
    pub fn open(config: &StoreConfig, backend: Arc<dyn Backend>) -> TableResult<Self> {
        Self::open_with_ids(config, backend, Arc::new(RandomIds))
    }

    /// Opens a store over `backend`, drawing ids from `ids`.
    ///
    /// Loads the persisted snapshot, rebuilds indexes and checks that every
    /// stored cell decodes under its field's type.
    pub fn open_with_ids(
        config: &StoreConfig,
        backend: Arc<dyn Backend>,
        ids: Arc<dyn IdGenerator>,
    ) -> TableResult<Self> {
        config.validate()?;
        Logger::set_min_severity(config.log_level);

        let codec = config.codec();
        let data = Dataset::from_snapshot(backend.load()?)?;
        data.verify_cells(&codec)?;

        let tables = data.table_count().to_string();
        let cells = data.cell_count().to_string();
        let state = StoreState::new(backend, data, codec, ids, config.edit_timeout());
        log_event_with_fields(Event::StoreOpened, &[("tables", &tables), ("cells", &cells)]);

        Ok(Self {
            state: Arc::new(state),
        })
    }

    /// Opens the file store under `config.data_dir`.
    pub fn open_dir(config: &StoreConfig) -> TableResult<Self> {
        let backend = FileBackend::in_dir(&config.data_dir)?;
        Self::open(config, Arc::new(backend))
    }

    /// Empty store backed by process memory.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(StoreState::new(
                Arc::new(MemoryBackend::new()),
                Dataset::new(),
                StoreConfig::default().codec(),
                Arc::new(RandomIds),
                StoreConfig::default().edit_timeout(),
            )),
        }
    }

    pub fn schema(&self) -> SchemaRegistry {
        SchemaRegistry::new(Arc::clone(&self.state))
    }

    pub fn records(&self) -> RecordStore {
        RecordStore::new(Arc::clone(&self.state))
    }

    pub fn coordinator(&self) -> ConsistencyCoordinator {
        ConsistencyCoordinator::new(Arc::clone(&self.state))
    }

    pub fn loader(&self) -> BulkLoader {
        BulkLoader::new(self.schema(), self.records())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.state.metrics().snapshot()
    }

    /// Flushes and releases the backend.
    pub fn close(&self) -> TableResult<()> {
        self.state.backend().close()?;
        log_event_with_fields(Event::StoreClosed, &[]);
        Ok(())
    }
}
