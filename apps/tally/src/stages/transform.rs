//! # Transform Stage
//!
//! Reads the cleaned interaction table, derives the three views and writes
//! four tables to the output location:
//!
//! | Table                  | Content                                  |
//! |------------------------|------------------------------------------|
//! | `<output table>`       | the cleaned table, echoed unchanged      |
//! | `interactions_count`   | every row plus the size of its pair group |
//! | `interactions_per_day` | one row per calendar date, ascending     |
//! | `top_5_users`          | up to five users by interaction count    |
//!
//! Each table is fully replaced. Writes are not atomic across tables: a
//! failure part way leaves the earlier tables written and the later ones as
//! they were.

use crate::config::TableLocation;
use serde::Serialize;
use tally_core::primitives::{DAILY_TOTALS_TABLE, PAIR_COUNTS_TABLE, TOP_USERS_TABLE};
use tally_core::{Aggregator, DerivedViews, InteractionTable, SqliteStore, TallyError};

/// Fixed names of the derived view tables, in write order.
pub const DERIVED_TABLES: [&str; 3] = [PAIR_COUNTS_TABLE, DAILY_TOTALS_TABLE, TOP_USERS_TABLE];

/// Row counts of the four written tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub table: String,
    pub echoed: usize,
    pub pair_counts: usize,
    pub daily_totals: usize,
    pub top_users: usize,
}

impl TransformReport {
    fn new(output: &TableLocation, table: &InteractionTable, views: &DerivedViews) -> Self {
        Self {
            table: output.to_string(),
            echoed: table.len(),
            pair_counts: views.pair_counts.len(),
            daily_totals: views.daily_totals.len(),
            top_users: views.top_users.len(),
        }
    }
}

/// Check whether `name` resolves to one of `DERIVED_TABLES`.
///
/// SQLite matches table names case-insensitively (ASCII), so this does too.
pub fn is_derived_table(name: &str) -> bool {
    DERIVED_TABLES
        .iter()
        .any(|derived| derived.eq_ignore_ascii_case(name))
}

/// Write the echoed table and the three views to `output`.
pub fn write_outputs(
    table: &InteractionTable,
    views: &DerivedViews,
    output: &TableLocation,
) -> Result<(), TallyError> {
    let db = &output.db_path;

    SqliteStore::write(table.rows(), db, &output.table_name)?;
    SqliteStore::write(&views.pair_counts, db, PAIR_COUNTS_TABLE)?;
    SqliteStore::write(&views.daily_totals, db, DAILY_TOTALS_TABLE)?;
    SqliteStore::write(&views.top_users, db, TOP_USERS_TABLE)?;

    Ok(())
}

/// Run the transform stage.
///
/// # Errors
/// - `ConfigError` if the output table name is one of `DERIVED_TABLES`
/// - `StoreUnavailable` if either location cannot be opened
/// - `SchemaError` if the cleaned table or one of its columns is absent
/// - `WriteError` if any of the four writes fails
pub fn run(source: &TableLocation, output: &TableLocation) -> Result<TransformReport, TallyError> {
    if is_derived_table(&output.table_name) {
        return Err(TallyError::ConfigError(format!(
            "output table '{}' collides with a derived view",
            output.table_name
        )));
    }

    let table = SqliteStore::read_interactions(&source.db_path, &source.table_name)?;
    tracing::debug!(rows = table.len(), source = %source, "Loaded cleaned table");

    let views = Aggregator::aggregate(&table);
    write_outputs(&table, &views, output)?;

    let report = TransformReport::new(output, &table, &views);
    tracing::info!(
        echoed = report.echoed,
        days = report.daily_totals,
        top_users = report.top_users,
        output = %output,
        "Transformed interactions"
    );

    Ok(report)
}
