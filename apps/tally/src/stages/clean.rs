//! Raw table cleaning.
//!
//! Drops every row with a missing column and validates the rest into typed
//! records. A present but malformed action or timestamp aborts the stage
//! rather than being silently discarded.

use crate::config::TableLocation;
use serde::Serialize;
use tally_core::{InteractionTable, RawInteraction, SqliteStore, TallyError};

/// Outcome of a clean run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub table: String,
    pub kept: usize,
    pub dropped: usize,
}

/// Split raw rows into a typed table and a count of rows with nulls.
pub fn clean_rows(rows: Vec<RawInteraction>) -> Result<(InteractionTable, usize), TallyError> {
    let mut table = InteractionTable::new();
    let mut dropped = 0usize;

    for row in rows {
        match row.into_record()? {
            Some(record) => table.push(record),
            None => dropped += 1,
        }
    }

    Ok((table, dropped))
}

/// Run the clean stage: raw table to cleaned table.
pub fn run(source: &TableLocation, target: &TableLocation) -> Result<CleanReport, TallyError> {
    let rows: Vec<RawInteraction> = SqliteStore::read(&source.db_path, &source.table_name)?;
    let (table, dropped) = clean_rows(rows)?;

    SqliteStore::write(table.rows(), &target.db_path, &target.table_name)?;

    if dropped > 0 {
        tracing::warn!(dropped, source = %source, "Dropped rows with missing values");
    }
    tracing::info!(kept = table.len(), table = %target, "Cleaned interactions");

    Ok(CleanReport {
        table: target.to_string(),
        kept: table.len(),
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Action, InteractionRecord};
    use tempfile::TempDir;

    fn raw(id: i64, action: Option<&str>, ts: Option<&str>) -> RawInteraction {
        RawInteraction {
            interaction_id: Some(id),
            user_id: Some(1),
            product_id: Some(2),
            action: action.map(str::to_string),
            timestamp: ts.map(str::to_string),
        }
    }

    #[test]
    fn rows_with_nulls_are_dropped() {
        let rows = vec![
            raw(1, Some("view"), Some("2024-01-01 08:00:00")),
            raw(2, None, Some("2024-01-01")),
            raw(3, Some("click"), None),
            raw(4, Some("purchase"), Some("2024-01-03T09:15:00")),
        ];

        let (table, dropped) = clean_rows(rows).expect("clean");
        assert_eq!(dropped, 2);
        let ids: Vec<_> = table.iter().map(|r| r.interaction_id.0).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(table.rows()[1].action, Action::Purchase);
    }

    #[test]
    fn unknown_action_aborts() {
        let rows = vec![raw(1, Some("like"), Some("2024-01-01"))];
        assert!(matches!(
            clean_rows(rows),
            Err(TallyError::InvalidRecord(_))
        ));
    }

    #[test]
    fn bad_timestamp_aborts() {
        let rows = vec![raw(1, Some("view"), Some("yesterday"))];
        assert!(matches!(
            clean_rows(rows),
            Err(TallyError::InvalidRecord(_))
        ));
    }

    #[test]
    fn run_writes_typed_table() {
        let dir = TempDir::new().expect("tempdir");
        let source = TableLocation::new(dir.path().join("rep.db"), "rep_interaction");
        let target = TableLocation::new(dir.path().join("raw.db"), "raw_interaction");

        let rows = vec![
            raw(1, Some("view"), Some("2024-01-01 08:00:00")),
            RawInteraction::default(),
        ];
        SqliteStore::write(&rows, &source.db_path, &source.table_name).expect("seed");

        let report = run(&source, &target).expect("clean");
        assert_eq!((report.kept, report.dropped), (1, 1));

        let stored = SqliteStore::read_interactions(&target.db_path, &target.table_name)
            .expect("read back");
        let first: Vec<&InteractionRecord> = stored.iter().collect();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].action, Action::View);
    }

    #[test]
    fn missing_source_table_is_schema_error() {
        let dir = TempDir::new().expect("tempdir");
        let source = TableLocation::new(dir.path().join("rep.db"), "rep_interaction");
        let target = TableLocation::new(dir.path().join("raw.db"), "raw_interaction");
        SqliteStore::write::<RawInteraction>(&[], &source.db_path, "other").expect("seed");

        assert!(matches!(
            run(&source, &target),
            Err(TallyError::SchemaError(_))
        ));
    }
}
