//! # tally-core
//!
//! The deterministic aggregation engine for Tally - THE LOGIC.
//!
//! Tally turns a table of user–product interactions into three summary
//! views: per-pair interaction counts, per-day totals and a top-5 user
//! ranking. This crate holds everything that is not process plumbing:
//! - `types`: records, tables, derived rows and the error type
//! - `aggregator`: the pure view computation
//! - `storage`: the SQLite store adapter (scoped connections, full replace)
//! - `export`: canonical table bytes and checksums for run comparison
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust + SQLite)
//! - Never logs; errors are returned, the app layer reports them
//! - The aggregator borrows its input and returns owned output; it never
//!   mutates a table in place

// =============================================================================
// MODULES
// =============================================================================

pub mod aggregator;
pub mod export;
pub mod primitives;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Action, DailyTotalRow, DerivedViews, InteractionCount, InteractionId, InteractionRecord,
    InteractionTable, PairCountRow, ProductId, RawInteraction, TallyError, UserId, UserTotalRow,
    format_date, format_timestamp, parse_date, parse_timestamp,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use aggregator::Aggregator;
pub use export::{CanonicalHeader, canonical_bytes, canonical_checksum, canonical_header};
pub use storage::{Column, SqlType, SqliteStore, TableRow};

#[cfg(feature = "crypto-hash")]
pub use export::canonical_crypto_hash;
