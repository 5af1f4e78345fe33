//! # Record Store
//!
//! Records and their cells. Values are validated against the field's
//! current type on write and decoded with it on read.
//!
//! - At most one cell per field per record
//! - Writes against a disabled table fail with `TableDisabled`
//! - `required` is not enforced here; sparse rows are valid

mod store;
mod types;

pub use store::RecordStore;
pub use types::{Cell, Record, RecordView, RowValues};
