//! # Bulk Loader
//!
//! Creates whole tables (schema plus rows) for setup and demo flows, and
//! removes them again. Safe to re-run: existing tables are skipped.

mod bulk;
pub mod demo;

pub use bulk::{
    BulkLoader, CancelToken, CleanupReport, SampleRows, SeedReport, SeededTable, TableFailure,
    TableSpec,
};
