//! CLI argument definitions using clap
//!
//! Commands:
//! - tablestore init --config <path>
//! - tablestore seed --config <path> --project <id>
//! - tablestore cleanup --config <path> --project <id>
//! - tablestore tables --config <path> --project <id>
//! - tablestore schema --config <path> --project <id> --table <external id>
//! - tablestore rows --config <path> --project <id> --table <external id>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tablestore - runtime-defined tables with typed cells
#[derive(Parser, Debug)]
#[command(name = "tablestore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and an empty store file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./tablestore.json")]
        config: PathBuf,
    },

    /// Load the ERP demo catalog (existing tables are skipped)
    Seed {
        #[arg(long, default_value = "./tablestore.json")]
        config: PathBuf,
        /// Project the tables belong to
        #[arg(long, default_value = "default")]
        project: String,
    },

    /// Remove the ERP demo catalog tables
    Cleanup {
        #[arg(long, default_value = "./tablestore.json")]
        config: PathBuf,
        #[arg(long, default_value = "default")]
        project: String,
    },

    /// List the tables of a project
    Tables {
        #[arg(long, default_value = "./tablestore.json")]
        config: PathBuf,
        #[arg(long, default_value = "default")]
        project: String,
    },

    /// Print the ordered fields of a table
    Schema {
        #[arg(long, default_value = "./tablestore.json")]
        config: PathBuf,
        #[arg(long, default_value = "default")]
        project: String,
        /// External id of the table
        #[arg(long)]
        table: String,
    },

    /// Print the decoded records of a table
    Rows {
        #[arg(long, default_value = "./tablestore.json")]
        config: PathBuf,
        #[arg(long, default_value = "default")]
        project: String,
        /// External id of the table
        #[arg(long)]
        table: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_command() {
        let cli = Cli::try_parse_from([
            "tablestore",
            "rows",
            "--config",
            "/tmp/t.json",
            "--table",
            "erp_stock",
        ])
        .unwrap();

        match cli.command {
            Command::Rows {
                config,
                project,
                table,
            } => {
                assert_eq!(config, PathBuf::from("/tmp/t.json"));
                assert_eq!(project, "default");
                assert_eq!(table, "erp_stock");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_schema_requires_table() {
        assert!(Cli::try_parse_from(["tablestore", "schema"]).is_err());
    }
}
