//! CLI module for tablestore
//!
//! Provides command-line interface for:
//! - init: Create the data directory and an empty store file
//! - seed / cleanup: Load or remove the ERP demo catalog
//! - tables / schema / rows: Inspect stored tables

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{cleanup, init, rows, run, run_command, schema, seed, tables};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
