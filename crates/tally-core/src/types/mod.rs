//! # Core Type Definitions
//!
//! This module contains all core types for the Tally interaction pipeline:
//! - Identifiers and counters (`InteractionId`, `UserId`, `ProductId`, `InteractionCount`)
//! - Record representation (`Action`, `InteractionRecord`, `RawInteraction`)
//! - Tables (`InteractionTable`) and derived rows (`PairCountRow`, `DailyTotalRow`, `UserTotalRow`)
//! - Error types (`TallyError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they act as grouping keys in `BTreeMap`
//! - Use saturating arithmetic for counters to prevent overflow

use crate::primitives::{
    DATE_FORMAT, TIMESTAMP_FORMAT, TIMESTAMP_INPUT_FORMATS, TIMESTAMP_OFFSET_FORMATS,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Natural key of an interaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InteractionId(pub i64);

/// Identifier of the user who performed an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Identifier of the product an interaction refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

/// Number of interaction records in a group.
/// Uses i64 (the SQLite INTEGER width) with saturating arithmetic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct InteractionCount(pub i64);

impl InteractionCount {
    /// Create a new count with the given value.
    #[must_use]
    pub const fn new(count: i64) -> Self {
        Self(count)
    }

    /// Increment the count by 1 using saturating arithmetic.
    #[must_use]
    pub const fn increment(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Get the raw count value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

// =============================================================================
// ACTION
// =============================================================================

/// The kind of interaction a user had with a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Click,
    Purchase,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 3] = [Action::View, Action::Click, Action::Purchase];

    /// The stored text form of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Click => "click",
            Action::Purchase => "purchase",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Action::View),
            "click" => Ok(Action::Click),
            "purchase" => Ok(Action::Purchase),
            other => Err(TallyError::InvalidRecord(format!(
                "unknown action '{}' (expected view, click or purchase)",
                other
            ))),
        }
    }
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Parse a stored timestamp.
///
/// Accepts ISO 8601 date-times with a space or `T` separator, with or
/// without seconds and fraction; a `Z` suffix or a numeric offset
/// (normalized to UTC); and a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TallyError> {
    let s = s.trim();
    let naive = s.strip_suffix(['Z', 'z']).unwrap_or(s);

    for format in TIMESTAMP_INPUT_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(naive, format) {
            return Ok(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_utc());
    }

    for format in TIMESTAMP_OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, format) {
            return Ok(ts.naive_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }

    Err(TallyError::InvalidRecord(format!(
        "unparseable timestamp '{}'",
        s
    )))
}

/// Format a timestamp the way it is written to the store.
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored calendar date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, TallyError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| TallyError::InvalidRecord(format!("unparseable date '{}': {}", s, e)))
}

/// Format a calendar date the way it is written to the store.
#[must_use]
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// =============================================================================
// INTERACTION RECORD
// =============================================================================

/// One cleaned user–product interaction.
///
/// `interaction_id` is the natural key. Duplicated ids are carried through
/// unchanged; deduplication is not a transform concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub interaction_id: InteractionId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub action: Action,
    pub timestamp: NaiveDateTime,
}

impl InteractionRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(
        interaction_id: InteractionId,
        user_id: UserId,
        product_id: ProductId,
        action: Action,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            interaction_id,
            user_id,
            product_id,
            action,
            timestamp,
        }
    }

    /// The `(user_id, product_id)` grouping key.
    #[must_use]
    pub fn pair(&self) -> (UserId, ProductId) {
        (self.user_id, self.product_id)
    }

    /// The calendar date of the timestamp (time of day dropped).
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

// =============================================================================
// RAW INTERACTION
// =============================================================================

/// An interaction as loaded by the ingest stage, before cleaning.
///
/// Every column may be missing and `action`/`timestamp` are unvalidated text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawInteraction {
    pub interaction_id: Option<i64>,
    pub user_id: Option<i64>,
    pub product_id: Option<i64>,
    pub action: Option<String>,
    pub timestamp: Option<String>,
}

impl RawInteraction {
    /// Check whether any column is missing.
    #[must_use]
    pub fn has_nulls(&self) -> bool {
        self.interaction_id.is_none()
            || self.user_id.is_none()
            || self.product_id.is_none()
            || self.action.is_none()
            || self.timestamp.is_none()
    }

    /// Convert into a typed record.
    ///
    /// Returns `Ok(None)` when any column is missing, and
    /// `TallyError::InvalidRecord` when a present value cannot be parsed.
    pub fn into_record(self) -> Result<Option<InteractionRecord>, TallyError> {
        let (Some(id), Some(user), Some(product), Some(action), Some(timestamp)) = (
            self.interaction_id,
            self.user_id,
            self.product_id,
            self.action,
            self.timestamp,
        ) else {
            return Ok(None);
        };

        let action = action.trim().parse::<Action>()?;
        let timestamp = parse_timestamp(&timestamp)?;

        Ok(Some(InteractionRecord::new(
            InteractionId(id),
            UserId(user),
            ProductId(product),
            action,
            timestamp,
        )))
    }
}

impl From<&InteractionRecord> for RawInteraction {
    fn from(record: &InteractionRecord) -> Self {
        Self {
            interaction_id: Some(record.interaction_id.0),
            user_id: Some(record.user_id.0),
            product_id: Some(record.product_id.0),
            action: Some(record.action.as_str().to_string()),
            timestamp: Some(format_timestamp(&record.timestamp)),
        }
    }
}

// =============================================================================
// INTERACTION TABLE
// =============================================================================

/// An ordered, in-memory interaction table.
///
/// Order is the load order of the store. It carries no meaning for grouping
/// but makes every derived view reproducible for a given input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InteractionTable {
    rows: Vec<InteractionRecord>,
}

impl InteractionTable {
    /// Create a new empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: InteractionRecord) {
        self.rows.push(record);
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over records in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, InteractionRecord> {
        self.rows.iter()
    }

    /// Borrow the records as a slice.
    #[must_use]
    pub fn rows(&self) -> &[InteractionRecord] {
        &self.rows
    }

}

impl From<Vec<InteractionRecord>> for InteractionTable {
    fn from(rows: Vec<InteractionRecord>) -> Self {
        Self { rows }
    }
}

impl FromIterator<InteractionRecord> for InteractionTable {
    fn from_iter<I: IntoIterator<Item = InteractionRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a InteractionTable {
    type Item = &'a InteractionRecord;
    type IntoIter = std::slice::Iter<'a, InteractionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// =============================================================================
// DERIVED ROWS
// =============================================================================

/// An interaction record widened with the size of its `(user, product)` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCountRow {
    pub record: InteractionRecord,
    pub interaction_count: InteractionCount,
}

/// Number of interactions that happened on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotalRow {
    pub date: NaiveDate,
    pub interaction_count: InteractionCount,
}

/// Total number of interactions of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTotalRow {
    pub user_id: UserId,
    pub interaction_count: InteractionCount,
}

/// The three views derived from one interaction table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivedViews {
    /// One row per input record, in stable join order.
    pub pair_counts: Vec<PairCountRow>,
    /// One row per distinct date, ascending.
    pub daily_totals: Vec<DailyTotalRow>,
    /// At most `TOP_N_USERS` rows, descending by count.
    pub top_users: Vec<UserTotalRow>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Tally pipeline.
///
/// - No silent failures
/// - Use `Result<T, TallyError>` for fallible operations
/// - Nothing is recovered locally; the first error aborts the stage
#[derive(Debug, Error)]
pub enum TallyError {
    /// The store location cannot be opened or created.
    #[error("Store unavailable at {0}: {1}")]
    StoreUnavailable(String, String),

    /// An expected table or column is absent.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A write was rejected (constraint or type violation).
    #[error("Write error: {0}")]
    WriteError(String),

    /// A stored or ingested value cannot be decoded into a record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Another pipeline run holds the run lock.
    #[error("Pipeline run already in progress (lock file {0})")]
    RunInProgress(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
