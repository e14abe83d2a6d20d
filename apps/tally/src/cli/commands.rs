//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{GenerateConfig, PipelineConfig};
use crate::digest::digest_outputs;
use crate::pipeline::{self, Stage, StageReport};
use crate::stages;
use serde::Serialize;
use std::path::PathBuf;
use tally_core::TallyError;

/// Print `value` as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<(), TallyError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| TallyError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Print a stage report, as JSON or as one line of text.
fn print_report(report: &StageReport, json_mode: bool) -> Result<(), TallyError> {
    if json_mode {
        return print_json(report);
    }
    println!("{}", report);
    Ok(())
}

// =============================================================================
// STAGE COMMANDS
// =============================================================================

/// Generate synthetic interactions.
pub fn cmd_generate(
    config: &PipelineConfig,
    json_mode: bool,
    num_rows: Option<usize>,
    file_path: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<(), TallyError> {
    let generate = GenerateConfig {
        num_rows: num_rows.unwrap_or(config.generate.num_rows),
        file_path: file_path.unwrap_or_else(|| config.generate.file_path.clone()),
        seed: seed.or(config.generate.seed),
    };

    let report = stages::generate::run(&generate)?;
    print_report(&StageReport::Generate(report), json_mode)
}

/// Ingest a CSV file into the raw table.
pub fn cmd_ingest(
    config: &PipelineConfig,
    json_mode: bool,
    generated_file_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    table_name: Option<String>,
) -> Result<(), TallyError> {
    let source = generated_file_path.unwrap_or_else(|| config.generate.file_path.clone());
    let target = config.ingest.with_overrides(db_path, table_name);

    let report = stages::ingest::run(&source, &target)?;
    print_report(&StageReport::Ingest(report), json_mode)
}

/// Clean the raw table.
pub fn cmd_clean(
    config: &PipelineConfig,
    json_mode: bool,
    ingested_db_path: Option<PathBuf>,
    ingested_table_name: Option<String>,
    cleaned_db_path: Option<PathBuf>,
    cleaned_table_name: Option<String>,
) -> Result<(), TallyError> {
    let source = config
        .ingest
        .with_overrides(ingested_db_path, ingested_table_name);
    let target = config
        .clean
        .with_overrides(cleaned_db_path, cleaned_table_name);

    let report = stages::clean::run(&source, &target)?;
    print_report(&StageReport::Clean(report), json_mode)
}

/// Derive the summary views.
pub fn cmd_transform(
    config: &PipelineConfig,
    json_mode: bool,
    clean_db_path: Option<PathBuf>,
    clean_table_name: Option<String>,
    transformed_db_path: Option<PathBuf>,
    transformed_table_name: Option<String>,
) -> Result<(), TallyError> {
    let source = config.clean.with_overrides(clean_db_path, clean_table_name);
    let output = config
        .transform
        .with_overrides(transformed_db_path, transformed_table_name);

    let report = stages::transform::run(&source, &output)?;
    print_report(&StageReport::Transform(report), json_mode)
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Run the pipeline from `from` through transform.
pub fn cmd_run(config: &PipelineConfig, json_mode: bool, from: Stage) -> Result<(), TallyError> {
    let reports = pipeline::run(config, from)?;

    if json_mode {
        return print_json(&reports);
    }

    println!("Tally Pipeline Run");
    println!("==================");
    for report in &reports {
        println!("  {}", report);
    }

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Digest the transform output tables.
pub fn cmd_hash(
    config: &PipelineConfig,
    json_mode: bool,
    db_path: Option<PathBuf>,
    table_name: Option<String>,
) -> Result<(), TallyError> {
    let output = config.transform.with_overrides(db_path, table_name);
    let digests = digest_outputs(&output)?;

    if json_mode {
        let value = serde_json::json!({
            "database": output.db_path.to_string_lossy(),
            "tables": digests,
        });
        return print_json(&value);
    }

    println!("Tally Output Digest");
    println!("===================");
    println!("Database: {:?}", output.db_path);
    println!();
    for digest in &digests {
        println!("{}", digest.table);
        println!("  Rows:     {}", digest.rows);
        println!("  Checksum: {}", digest.checksum);
        println!("  BLAKE3:   {}", digest.blake3);
    }

    Ok(())
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the effective configuration as JSON.
pub fn cmd_config(config: &PipelineConfig) -> Result<(), TallyError> {
    print_json(config)
}
