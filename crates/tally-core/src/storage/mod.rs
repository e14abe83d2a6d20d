//! # Storage Module
//!
//! Relational persistence for Tally tables.
//!
//! - `SqliteStore`: the store adapter. One connection per read or write,
//!   full-replace writes, unfiltered reads.
//! - `TableRow`: maps a typed row to its column schema and SQLite values.
//!   Every table the pipeline reads or writes goes through this trait, so the
//!   schema of a table never depends on whether it has rows.

mod rows;
mod sqlite;

pub use rows::{
    DAILY_TOTAL_COLUMNS, INTERACTION_COLUMNS, PAIR_COUNT_COLUMNS, RAW_INTERACTION_COLUMNS,
    USER_TOTAL_COLUMNS,
};
pub use sqlite::{SqliteStore, quote_identifier};

use crate::TallyError;
use rusqlite::Row;
use rusqlite::types::Value as SqlValue;

// =============================================================================
// COLUMN SCHEMA
// =============================================================================

/// SQLite storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Text,
}

impl SqlType {
    /// The type name used in `CREATE TABLE`.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Text => "TEXT",
        }
    }
}

/// One column of a stored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl Column {
    /// A column that must never hold NULL.
    #[must_use]
    pub const fn required(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
        }
    }

    /// A column that may hold NULL.
    #[must_use]
    pub const fn nullable(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
        }
    }

    /// Column definition for `CREATE TABLE`.
    #[must_use]
    pub fn definition(&self) -> String {
        let mut def = format!("{} {}", quote_identifier(self.name), self.sql_type.as_sql());
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }
}

// =============================================================================
// TABLE ROW TRAIT
// =============================================================================

/// A row type that can be stored in, and loaded from, a relational table.
///
/// `to_values` and `from_row` use the order of `COLUMNS`.
pub trait TableRow: Sized {
    /// The column schema, in storage order.
    const COLUMNS: &'static [Column];

    /// Convert the row into SQLite values.
    fn to_values(&self) -> Vec<SqlValue>;

    /// Decode a row selected with the columns of `COLUMNS`, in order.
    ///
    /// Returns `TallyError::InvalidRecord` if a value cannot be decoded.
    fn from_row(row: &Row<'_>) -> Result<Self, TallyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_column_definition() {
        let col = Column::required("user_id", SqlType::Integer);
        assert_eq!(col.definition(), "\"user_id\" INTEGER NOT NULL");
    }

    #[test]
    fn nullable_column_definition() {
        let col = Column::nullable("action", SqlType::Text);
        assert_eq!(col.definition(), "\"action\" TEXT");
    }
}
