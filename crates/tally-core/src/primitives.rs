//! # Pipeline Primitives
//!
//! Hardcoded runtime constants for the Tally pipeline.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Store locations and input table names are NOT primitives: they are
//! configuration and are threaded explicitly through every stage.

// =============================================================================
// AGGREGATION
// =============================================================================

/// Number of users kept by the top-users ranking.
pub const TOP_N_USERS: usize = 5;

/// Output table holding per-record pair counts.
pub const PAIR_COUNTS_TABLE: &str = "interactions_count";

/// Output table holding per-day interaction totals.
pub const DAILY_TOTALS_TABLE: &str = "interactions_per_day";

/// Output table holding the top-users ranking.
pub const TOP_USERS_TABLE: &str = "top_5_users";

// =============================================================================
// TIMESTAMP FORMATS
// =============================================================================

/// Format used when writing timestamps to the store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Naive formats accepted when reading timestamps (fraction optional,
/// seconds optional). A trailing `Z` is stripped before these are tried.
pub const TIMESTAMP_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Offset-carrying formats accepted when reading timestamps; the instant is
/// normalized to UTC.
pub const TIMESTAMP_OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Calendar date format of the daily totals view.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// SYNTHETIC DATA BOUNDS
// =============================================================================

/// Default number of generated interactions.
pub const DEFAULT_NUM_ROWS: usize = 1000;

/// Generated user ids are drawn from `1..=MAX_USER_ID`.
pub const MAX_USER_ID: i64 = 100;

/// Generated product ids are drawn from `1..=MAX_PRODUCT_ID`.
pub const MAX_PRODUCT_ID: i64 = 50;

/// Generated timestamps lie up to this many days in the past.
pub const MAX_AGE_DAYS: i64 = 30;
