//! tablestore - a dynamic tabular data store
//!
//! Users define tables and typed fields at runtime and store records as
//! one cell per (record, field). Schema edits such as retyping a field
//! convert the cells that already exist, and never leave a cell behind
//! that its field cannot decode.
//!
//! Entry point is [`TableStore`], which hands out:
//! - [`schema::SchemaRegistry`]: tables and fields
//! - [`records::RecordStore`]: records and cell values
//! - [`coordinator::ConsistencyCoordinator`]: destructive schema edits
//! - [`loader::BulkLoader`]: idempotent seeding and cleanup

pub mod backend;
pub mod cli;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod ids;
pub mod loader;
pub mod observability;
pub mod records;
pub mod schema;
pub mod store;

pub use codec::{LogicalValue, ValueCodec};
pub use config::StoreConfig;
pub use coordinator::{RetypeMode, RetypeReport};
pub use errors::{TableError, TableResult};
pub use ids::{CellId, FieldId, ProjectId, RecordId, TableId};
pub use records::RowValues;
pub use schema::{FieldSpec, FieldType, TableStatus};
pub use store::TableStore;
