//! CSV ingestion into the raw table.
//!
//! Every column lands nullable: an empty CSV field becomes NULL, values are
//! not validated beyond their integer columns. Cleaning happens downstream.

use crate::config::TableLocation;
use serde::Serialize;
use std::path::Path;
use tally_core::storage::RAW_INTERACTION_COLUMNS;
use tally_core::{RawInteraction, SqliteStore, TallyError};

/// Outcome of an ingest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub table: String,
    pub rows: usize,
}

/// Read a generated CSV file into raw interactions.
///
/// # Errors
/// - `IoError` if the file cannot be opened or read
/// - `SchemaError` if the header lacks one of the interaction columns
/// - `InvalidRecord` if an integer column holds a non-integer value
pub fn read_csv(path: &Path) -> Result<Vec<RawInteraction>, TallyError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| TallyError::IoError(format!("Cannot open '{}': {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| read_error(path, e))?
        .clone();
    for column in RAW_INTERACTION_COLUMNS {
        if !headers.iter().any(|h| h.trim() == column.name) {
            return Err(TallyError::SchemaError(format!(
                "'{}' has no column '{}'",
                path.display(),
                column.name
            )));
        }
    }

    reader
        .deserialize::<RawInteraction>()
        .map(|row| row.map_err(|e| read_error(path, e)))
        .collect()
}

/// Run the ingest stage: CSV file to raw table.
pub fn run(source: &Path, target: &TableLocation) -> Result<IngestReport, TallyError> {
    let rows = read_csv(source)?;
    tracing::debug!(rows = rows.len(), source = %source.display(), "Read CSV");

    SqliteStore::write(&rows, &target.db_path, &target.table_name)?;
    tracing::info!(rows = rows.len(), table = %target, "Ingested interactions");

    Ok(IngestReport {
        table: target.to_string(),
        rows: rows.len(),
    })
}

fn read_error(path: &Path, e: csv::Error) -> TallyError {
    let position = e
        .position()
        .map(|p| format!(" at line {}", p.line()))
        .unwrap_or_default();

    if e.is_io_error() {
        TallyError::IoError(format!("Cannot read '{}'{}: {}", path.display(), position, e))
    } else {
        TallyError::InvalidRecord(format!("'{}'{}: {}", path.display(), position, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "interaction_id,user_id,product_id,action,timestamp\n";

    fn write_file(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("data.csv");
        std::fs::write(&path, body).expect("write csv");
        path
    }

    #[test]
    fn empty_fields_become_null() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(
            &dir,
            &format!("{HEADER}1,2,3,view,2024-01-01 10:00:00\n2,,3,,2024-01-02\n"),
        );

        let rows = read_csv(&path).expect("read");
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].has_nulls());
        assert_eq!(rows[1].user_id, None);
        assert_eq!(rows[1].action, None);
        assert_eq!(rows[1].timestamp.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn non_integer_id_is_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(&dir, &format!("{HEADER}x,2,3,view,2024-01-01\n"));

        assert!(matches!(read_csv(&path), Err(TallyError::InvalidRecord(_))));
    }

    #[test]
    fn missing_header_column_is_schema_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(&dir, "interaction_id,user_id,product_id,action\n1,2,3,view\n");

        assert!(matches!(read_csv(&path), Err(TallyError::SchemaError(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().expect("tempdir");
        assert!(matches!(
            read_csv(&dir.path().join("absent.csv")),
            Err(TallyError::IoError(_))
        ));
    }

    #[test]
    fn run_writes_raw_table() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(
            &dir,
            &format!("{HEADER}1,2,3,view,2024-01-01\n2,,4,click,2024-01-02\n"),
        );
        let target = TableLocation::new(dir.path().join("rep.db"), "rep_interaction");

        let report = run(&path, &target).expect("ingest");
        assert_eq!(report.rows, 2);

        let stored: Vec<RawInteraction> =
            SqliteStore::read(&target.db_path, &target.table_name).expect("read back");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].user_id, None);
        assert_eq!(stored[1].product_id, Some(4));
    }
}
