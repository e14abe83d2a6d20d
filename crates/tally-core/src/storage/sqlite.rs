//! # SQLite Store Adapter
//!
//! Reads and full-replace writes of whole tables in SQLite database files.
//!
//! Every call opens its own connection and closes it before returning; the
//! connection is also released when a call fails part-way. There is no
//! pooling and no connection reuse across calls.
//!
//! A write runs inside one transaction: `DROP TABLE IF EXISTS`, `CREATE
//! TABLE`, then one `INSERT` per row. Readers therefore see either the old
//! table or the new one, never a half-written one.

use super::{Column, TableRow};
use crate::{InteractionRecord, InteractionTable, TallyError};
use rusqlite::{Connection, ErrorCode, OpenFlags, params_from_iter};
use std::path::Path;

/// Quote an SQL identifier, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The store adapter. Stateless; every operation is scoped to one connection.
pub struct SqliteStore;

impl SqliteStore {
    /// Read every row of `table_name` at `location`.
    ///
    /// # Errors
    /// - `StoreUnavailable` if the location cannot be opened
    /// - `SchemaError` if the table or one of `T::COLUMNS` is absent
    /// - `InvalidRecord` if a stored value cannot be decoded
    pub fn read<T: TableRow>(
        location: impl AsRef<Path>,
        table_name: &str,
    ) -> Result<Vec<T>, TallyError> {
        let location = location.as_ref();
        let conn = open_read_only(location)?;
        let rows = select_all::<T>(&conn, location, table_name)?;
        close(conn, location)?;
        Ok(rows)
    }

    /// Read a cleaned interaction table.
    pub fn read_interactions(
        location: impl AsRef<Path>,
        table_name: &str,
    ) -> Result<InteractionTable, TallyError> {
        Self::read::<InteractionRecord>(location, table_name).map(InteractionTable::from)
    }

    /// Replace the full contents of `table_name` at `location` with `rows`.
    ///
    /// The database file is created if absent; the table is dropped and
    /// recreated with the `T::COLUMNS` schema, even when `rows` is empty.
    ///
    /// # Errors
    /// - `StoreUnavailable` if the location cannot be opened or created
    /// - `WriteError` on any DDL, constraint or insert failure
    pub fn write<T: TableRow>(
        rows: &[T],
        location: impl AsRef<Path>,
        table_name: &str,
    ) -> Result<(), TallyError> {
        let location = location.as_ref();
        let mut conn = Connection::open(location).map_err(|e| unavailable(location, &e))?;
        replace_table(&mut conn, rows, table_name)
            .map_err(|e| classify_write_error(location, table_name, &e))?;
        close(conn, location)
    }

    /// List the column names of `table_name`, in table order.
    ///
    /// Returns an empty list if the table does not exist.
    pub fn columns(
        location: impl AsRef<Path>,
        table_name: &str,
    ) -> Result<Vec<String>, TallyError> {
        let location = location.as_ref();
        let conn = open_read_only(location)?;
        let columns = table_columns(&conn, location, table_name)?;
        close(conn, location)?;
        Ok(columns)
    }
}

// =============================================================================
// CONNECTION HELPERS
// =============================================================================

fn unavailable(location: &Path, err: &rusqlite::Error) -> TallyError {
    TallyError::StoreUnavailable(location.display().to_string(), err.to_string())
}

fn open_read_only(location: &Path) -> Result<Connection, TallyError> {
    Connection::open_with_flags(
        location,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| unavailable(location, &e))
}

fn close(conn: Connection, location: &Path) -> Result<(), TallyError> {
    conn.close().map_err(|(_, e)| unavailable(location, &e))
}

fn classify_write_error(location: &Path, table_name: &str, err: &rusqlite::Error) -> TallyError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::ReadOnly
            ) =>
        {
            unavailable(location, err)
        }
        _ => TallyError::WriteError(format!("table '{}': {}", table_name, err)),
    }
}

// =============================================================================
// READ PATH
// =============================================================================

fn table_columns(
    conn: &Connection,
    location: &Path,
    table_name: &str,
) -> Result<Vec<String>, TallyError> {
    // First statement against the file: failures here mean the file is not a
    // usable database rather than a schema problem.
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(|e| unavailable(location, &e))?;
    let names = stmt
        .query_map([table_name], |row| row.get::<_, String>(0))
        .map_err(|e| unavailable(location, &e))?;

    names
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| unavailable(location, &e))
}

fn select_all<T: TableRow>(
    conn: &Connection,
    location: &Path,
    table_name: &str,
) -> Result<Vec<T>, TallyError> {
    let present = table_columns(conn, location, table_name)?;
    if present.is_empty() {
        return Err(TallyError::SchemaError(format!(
            "table '{}' does not exist in {}",
            table_name,
            location.display()
        )));
    }

    for column in T::COLUMNS {
        if !present.iter().any(|p| p.eq_ignore_ascii_case(column.name)) {
            return Err(TallyError::SchemaError(format!(
                "table '{}' has no column '{}'",
                table_name, column.name
            )));
        }
    }

    let select_list = T::COLUMNS
        .iter()
        .map(|c| quote_identifier(c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM {}",
        select_list,
        quote_identifier(table_name)
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| TallyError::SchemaError(format!("table '{}': {}", table_name, e)))?;
    let mut rows = stmt
        .query([])
        .map_err(|e| TallyError::SchemaError(format!("table '{}': {}", table_name, e)))?;

    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| TallyError::InvalidRecord(format!("table '{}': {}", table_name, e)))?
    {
        out.push(T::from_row(row)?);
    }

    Ok(out)
}

// =============================================================================
// WRITE PATH
// =============================================================================

fn replace_table<T: TableRow>(
    conn: &mut Connection,
    rows: &[T],
    table_name: &str,
) -> rusqlite::Result<()> {
    let table = quote_identifier(table_name);
    let definitions = T::COLUMNS
        .iter()
        .map(Column::definition)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=T::COLUMNS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
    tx.execute(&format!("CREATE TABLE {} ({})", table, definitions), [])?;
    {
        let mut insert = tx.prepare(&format!("INSERT INTO {} VALUES ({})", table, placeholders))?;
        for row in rows {
            insert.execute(params_from_iter(row.to_values()))?;
        }
    }
    tx.commit()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Action, DailyTotalRow, InteractionCount, InteractionId, ProductId, RawInteraction,
        UserId, UserTotalRow, parse_date, parse_timestamp,
    };
    use tempfile::TempDir;

    fn record(id: i64, user: i64, product: i64, ts: &str) -> InteractionRecord {
        InteractionRecord::new(
            InteractionId(id),
            UserId(user),
            ProductId(product),
            Action::View,
            parse_timestamp(ts).expect("timestamp"),
        )
    }

    #[test]
    fn write_then_read_preserves_rows_and_order() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");
        let rows = vec![
            record(3, 1, 1, "2024-01-01 10:00:00"),
            record(1, 2, 1, "2024-01-02 11:30:00.250"),
        ];

        SqliteStore::write(&rows, &db, "interactions").expect("write");
        let back: Vec<InteractionRecord> = SqliteStore::read(&db, "interactions").expect("read");

        assert_eq!(back, rows);
    }

    #[test]
    fn write_replaces_previous_contents() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");

        let first = vec![
            record(1, 1, 1, "2024-01-01"),
            record(2, 1, 1, "2024-01-01"),
            record(3, 1, 1, "2024-01-01"),
        ];
        SqliteStore::write(&first, &db, "t").expect("write");
        SqliteStore::write(&first[..1], &db, "t").expect("rewrite");

        let back = SqliteStore::read_interactions(&db, "t").expect("read");
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn empty_write_creates_schema() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");

        SqliteStore::write::<UserTotalRow>(&[], &db, "top").expect("write");

        let columns = SqliteStore::columns(&db, "top").expect("columns");
        assert_eq!(columns, vec!["user_id", "interaction_count"]);
        let rows: Vec<UserTotalRow> = SqliteStore::read(&db, "top").expect("read");
        assert!(rows.is_empty());
    }

    #[test]
    fn read_missing_location_is_store_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("absent.db");

        let result = SqliteStore::read_interactions(&db, "t");
        assert!(matches!(result, Err(TallyError::StoreUnavailable(_, _))));
        assert!(!db.exists());
    }

    #[test]
    fn read_missing_table_is_schema_error() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");
        SqliteStore::write::<UserTotalRow>(&[], &db, "other").expect("write");

        let result = SqliteStore::read_interactions(&db, "interactions");
        assert!(matches!(result, Err(TallyError::SchemaError(_))));
    }

    #[test]
    fn read_missing_column_is_schema_error() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");
        let conn = Connection::open(&db).expect("open");
        conn.execute_batch("CREATE TABLE t (interaction_id INTEGER, user_id INTEGER);")
            .expect("create");
        drop(conn);

        let result = SqliteStore::read_interactions(&db, "t");
        assert!(matches!(result, Err(TallyError::SchemaError(_))));
    }

    #[test]
    fn read_null_value_is_invalid_record() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");
        SqliteStore::write(
            &[RawInteraction {
                interaction_id: Some(1),
                user_id: Some(1),
                product_id: None,
                action: Some("view".to_string()),
                timestamp: Some("2024-01-01".to_string()),
            }],
            &db,
            "t",
        )
        .expect("write");

        let result = SqliteStore::read_interactions(&db, "t");
        assert!(matches!(result, Err(TallyError::InvalidRecord(_))));
    }

    #[test]
    fn write_into_missing_directory_is_store_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("no").join("such").join("store.db");

        let result = SqliteStore::write::<UserTotalRow>(&[], &db, "t");
        assert!(matches!(result, Err(TallyError::StoreUnavailable(_, _))));
    }

    #[test]
    fn write_rejected_by_sqlite_is_write_error() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");

        let result = SqliteStore::write::<UserTotalRow>(&[], &db, "sqlite_master");
        assert!(matches!(result, Err(TallyError::WriteError(_))));
    }

    #[test]
    fn identifiers_are_quoted() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("store.db");
        let rows = vec![DailyTotalRow {
            date: parse_date("2024-01-01").expect("date"),
            interaction_count: InteractionCount::new(4),
        }];

        SqliteStore::write(&rows, &db, "per \"day\" totals").expect("write");
        let back: Vec<DailyTotalRow> =
            SqliteStore::read(&db, "per \"day\" totals").expect("read");
        assert_eq!(back, rows);
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
