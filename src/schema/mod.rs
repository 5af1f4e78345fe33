//! # Schema Registry
//!
//! Tables and their typed, ordered fields. Definitions are mutable at
//! runtime; stored cells are kept valid against them by the coordinator.
//!
//! - Table external ids are unique per project
//! - Field names and external ids are unique per table
//! - Field edits on one table are serialized

pub mod naming;
mod registry;
mod types;

pub use registry::SchemaRegistry;
pub use types::{Field, FieldPatch, FieldSpec, FieldType, Table, TableStatus};
