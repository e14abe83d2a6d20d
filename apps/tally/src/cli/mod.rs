//! # Tally CLI Module
//!
//! This module implements the CLI interface for Tally.
//!
//! ## Available Commands
//!
//! - `generate` - Write synthetic interactions to CSV
//! - `ingest` - Load a CSV file into the raw table
//! - `clean` - Drop incomplete rows and validate the rest
//! - `transform` - Derive the summary views
//! - `run` - Run the pipeline from a given stage
//! - `hash` - Digest the transform output tables
//! - `config` - Print the effective configuration
//!
//! Stage flags override the matching `--config` values for that invocation.

mod commands;

use crate::pipeline::Stage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_core::TallyError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tally - interaction summary pipeline
///
/// Generates, ingests and cleans user-product interactions, then derives
/// per-pair counts, daily totals and a top-5 user ranking into SQLite.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML pipeline configuration
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate synthetic interactions as CSV
    Generate {
        /// Number of rows to generate
        #[arg(short = 'n', long)]
        num_rows: Option<usize>,

        /// Output CSV file
        #[arg(short, long)]
        file_path: Option<PathBuf>,

        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Load a generated CSV file into the raw table
    Ingest {
        /// Input CSV file
        #[arg(long)]
        generated_file_path: Option<PathBuf>,

        /// Raw database file
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Raw table name
        #[arg(long)]
        table_name: Option<String>,
    },

    /// Drop rows with missing values and validate the rest
    Clean {
        /// Raw database file
        #[arg(long)]
        ingested_db_path: Option<PathBuf>,

        /// Raw table name
        #[arg(long)]
        ingested_table_name: Option<String>,

        /// Cleaned database file
        #[arg(long)]
        cleaned_db_path: Option<PathBuf>,

        /// Cleaned table name
        #[arg(long)]
        cleaned_table_name: Option<String>,
    },

    /// Derive pair counts, daily totals and top users
    Transform {
        /// Cleaned database file
        #[arg(long)]
        clean_db_path: Option<PathBuf>,

        /// Cleaned table name
        #[arg(long)]
        clean_table_name: Option<String>,

        /// Output database file
        #[arg(long)]
        transformed_db_path: Option<PathBuf>,

        /// Output (echo) table name
        #[arg(long)]
        transformed_table_name: Option<String>,
    },

    /// Run the pipeline through transform
    Run {
        /// First stage to run
        #[arg(long, value_enum, default_value_t = Stage::Generate)]
        from: Stage,
    },

    /// Digest the transform output tables
    Hash {
        /// Output database file
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Output (echo) table name
        #[arg(long)]
        table_name: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), TallyError> {
    let config = crate::config::PipelineConfig::load_or_default(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Generate {
            num_rows,
            file_path,
            seed,
        } => cmd_generate(&config, json_mode, num_rows, file_path, seed),
        Commands::Ingest {
            generated_file_path,
            db_path,
            table_name,
        } => cmd_ingest(&config, json_mode, generated_file_path, db_path, table_name),
        Commands::Clean {
            ingested_db_path,
            ingested_table_name,
            cleaned_db_path,
            cleaned_table_name,
        } => cmd_clean(
            &config,
            json_mode,
            ingested_db_path,
            ingested_table_name,
            cleaned_db_path,
            cleaned_table_name,
        ),
        Commands::Transform {
            clean_db_path,
            clean_table_name,
            transformed_db_path,
            transformed_table_name,
        } => cmd_transform(
            &config,
            json_mode,
            clean_db_path,
            clean_table_name,
            transformed_db_path,
            transformed_table_name,
        ),
        Commands::Run { from } => cmd_run(&config, json_mode, from),
        Commands::Hash {
            db_path,
            table_name,
        } => cmd_hash(&config, json_mode, db_path, table_name),
        Commands::Config => cmd_config(&config),
    }
}
