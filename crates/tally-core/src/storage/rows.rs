//! Column schemas and SQLite value mapping for every stored row type.

use super::{Column, SqlType, TableRow};
use crate::{
    DailyTotalRow, InteractionCount, InteractionId, InteractionRecord, PairCountRow, ProductId,
    RawInteraction, TallyError, UserId, UserTotalRow, format_date, format_timestamp, parse_date,
    parse_timestamp,
};
use rusqlite::Row;
use rusqlite::types::{FromSql, Value as SqlValue};

// =============================================================================
// SCHEMAS
// =============================================================================

/// Cleaned (and echoed) interaction table.
pub const INTERACTION_COLUMNS: &[Column] = &[
    Column::required("interaction_id", SqlType::Integer),
    Column::required("user_id", SqlType::Integer),
    Column::required("product_id", SqlType::Integer),
    Column::required("action", SqlType::Text),
    Column::required("timestamp", SqlType::Text),
];

/// Ingested, not yet cleaned, interaction table.
pub const RAW_INTERACTION_COLUMNS: &[Column] = &[
    Column::nullable("interaction_id", SqlType::Integer),
    Column::nullable("user_id", SqlType::Integer),
    Column::nullable("product_id", SqlType::Integer),
    Column::nullable("action", SqlType::Text),
    Column::nullable("timestamp", SqlType::Text),
];

/// `interactions_count`: the interaction columns plus the pair count.
pub const PAIR_COUNT_COLUMNS: &[Column] = &[
    Column::required("interaction_id", SqlType::Integer),
    Column::required("user_id", SqlType::Integer),
    Column::required("product_id", SqlType::Integer),
    Column::required("action", SqlType::Text),
    Column::required("timestamp", SqlType::Text),
    Column::required("interaction_count", SqlType::Integer),
];

/// `interactions_per_day`.
pub const DAILY_TOTAL_COLUMNS: &[Column] = &[
    Column::required("date", SqlType::Text),
    Column::required("interaction_count", SqlType::Integer),
];

/// `top_5_users`.
pub const USER_TOTAL_COLUMNS: &[Column] = &[
    Column::required("user_id", SqlType::Integer),
    Column::required("interaction_count", SqlType::Integer),
];

// =============================================================================
// DECODING HELPERS
// =============================================================================

fn get<T: FromSql>(row: &Row<'_>, idx: usize) -> Result<T, TallyError> {
    row.get::<_, T>(idx).map_err(|e| {
        let name = row.as_ref().column_name(idx).unwrap_or("?").to_string();
        TallyError::InvalidRecord(format!("column '{}': {}", name, e))
    })
}

fn record_values(record: &InteractionRecord) -> Vec<SqlValue> {
    vec![
        SqlValue::Integer(record.interaction_id.0),
        SqlValue::Integer(record.user_id.0),
        SqlValue::Integer(record.product_id.0),
        SqlValue::Text(record.action.as_str().to_string()),
        SqlValue::Text(format_timestamp(&record.timestamp)),
    ]
}

fn opt_int(value: Option<i64>) -> SqlValue {
    value.map_or(SqlValue::Null, SqlValue::Integer)
}

fn opt_text(value: Option<&String>) -> SqlValue {
    value.map_or(SqlValue::Null, |s| SqlValue::Text(s.clone()))
}

// =============================================================================
// IMPLEMENTATIONS
// =============================================================================

impl TableRow for InteractionRecord {
    const COLUMNS: &'static [Column] = INTERACTION_COLUMNS;

    fn to_values(&self) -> Vec<SqlValue> {
        record_values(self)
    }

    fn from_row(row: &Row<'_>) -> Result<Self, TallyError> {
        let action: String = get(row, 3)?;
        let timestamp: String = get(row, 4)?;

        Ok(InteractionRecord::new(
            InteractionId(get(row, 0)?),
            UserId(get(row, 1)?),
            ProductId(get(row, 2)?),
            action.trim().parse()?,
            parse_timestamp(&timestamp)?,
        ))
    }
}

impl TableRow for RawInteraction {
    const COLUMNS: &'static [Column] = RAW_INTERACTION_COLUMNS;

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            opt_int(self.interaction_id),
            opt_int(self.user_id),
            opt_int(self.product_id),
            opt_text(self.action.as_ref()),
            opt_text(self.timestamp.as_ref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, TallyError> {
        Ok(RawInteraction {
            interaction_id: get(row, 0)?,
            user_id: get(row, 1)?,
            product_id: get(row, 2)?,
            action: get(row, 3)?,
            timestamp: get(row, 4)?,
        })
    }
}

impl TableRow for PairCountRow {
    const COLUMNS: &'static [Column] = PAIR_COUNT_COLUMNS;

    fn to_values(&self) -> Vec<SqlValue> {
        let mut values = record_values(&self.record);
        values.push(SqlValue::Integer(self.interaction_count.value()));
        values
    }

    fn from_row(row: &Row<'_>) -> Result<Self, TallyError> {
        Ok(PairCountRow {
            record: InteractionRecord::from_row(row)?,
            interaction_count: InteractionCount::new(get(row, 5)?),
        })
    }
}

impl TableRow for DailyTotalRow {
    const COLUMNS: &'static [Column] = DAILY_TOTAL_COLUMNS;

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(format_date(&self.date)),
            SqlValue::Integer(self.interaction_count.value()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, TallyError> {
        let date: String = get(row, 0)?;

        Ok(DailyTotalRow {
            date: parse_date(&date)?,
            interaction_count: InteractionCount::new(get(row, 1)?),
        })
    }
}

impl TableRow for UserTotalRow {
    const COLUMNS: &'static [Column] = USER_TOTAL_COLUMNS;

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.user_id.0),
            SqlValue::Integer(self.interaction_count.value()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, TallyError> {
        Ok(UserTotalRow {
            user_id: UserId(get(row, 0)?),
            interaction_count: InteractionCount::new(get(row, 1)?),
        })
    }
}
