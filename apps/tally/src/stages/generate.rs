//! Synthetic interaction generator.
//!
//! Produces `num_rows` interactions with sequential ids, uniformly drawn
//! users, products and actions, and timestamps up to `MAX_AGE_DAYS` days
//! before `now`, then writes them as CSV with a header row.

use crate::config::GenerateConfig;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::Path;
use tally_core::primitives::{MAX_AGE_DAYS, MAX_PRODUCT_ID, MAX_USER_ID};
use tally_core::{
    Action, InteractionId, InteractionRecord, InteractionTable, ProductId, RawInteraction,
    TallyError, UserId,
};

/// Outcome of a generate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    pub file_path: String,
    pub rows: usize,
}

/// Generate interactions in memory.
pub fn generate_interactions<R: Rng>(
    num_rows: usize,
    now: NaiveDateTime,
    rng: &mut R,
) -> InteractionTable {
    (1..=num_rows)
        .map(|i| {
            let age = Duration::days(rng.gen_range(0..=MAX_AGE_DAYS));
            InteractionRecord::new(
                InteractionId(i64::try_from(i).unwrap_or(i64::MAX)),
                UserId(rng.gen_range(1..=MAX_USER_ID)),
                ProductId(rng.gen_range(1..=MAX_PRODUCT_ID)),
                Action::ALL[rng.gen_range(0..Action::ALL.len())],
                now - age,
            )
        })
        .collect()
}

/// Write a table as CSV, header first.
pub fn write_csv(table: &InteractionTable, path: &Path) -> Result<(), TallyError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    for record in table {
        writer
            .serialize(RawInteraction::from(record))
            .map_err(|e| csv_error(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| TallyError::IoError(format!("Cannot flush '{}': {}", path.display(), e)))
}

/// Run the generate stage with the local clock as `now`.
pub fn run(config: &GenerateConfig) -> Result<GenerateReport, TallyError> {
    run_at(config, chrono::Local::now().naive_local())
}

/// Run the generate stage against a fixed `now`.
pub fn run_at(config: &GenerateConfig, now: NaiveDateTime) -> Result<GenerateReport, TallyError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let table = generate_interactions(config.num_rows, now, &mut rng);
    write_csv(&table, &config.file_path)?;

    tracing::info!(
        rows = table.len(),
        file = %config.file_path.display(),
        seeded = config.seed.is_some(),
        "Generated interactions"
    );

    Ok(GenerateReport {
        file_path: config.file_path.display().to_string(),
        rows: table.len(),
    })
}

fn csv_error(path: &Path, e: csv::Error) -> TallyError {
    TallyError::IoError(format!("Cannot write CSV '{}': {}", path.display(), e))
}
