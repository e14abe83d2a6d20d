//! Digests of the transform output tables.
//!
//! Two runs over the same cleaned input must produce identical digests,
//! which makes this the check for reproducible output.

use crate::config::TableLocation;
use serde::Serialize;
use tally_core::primitives::{DAILY_TOTALS_TABLE, PAIR_COUNTS_TABLE, TOP_USERS_TABLE};
use tally_core::{
    DailyTotalRow, InteractionRecord, PairCountRow, SqliteStore, TableRow, TallyError,
    UserTotalRow, canonical_bytes, canonical_checksum, canonical_crypto_hash, canonical_header,
};

/// Digest of one stored table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDigest {
    pub table: String,
    /// Row count as recorded in the canonical header.
    pub rows: u64,
    /// FNV-1a over the canonical bytes, hex.
    pub checksum: String,
    /// BLAKE3 over the canonical bytes, hex.
    pub blake3: String,
}

fn digest_table<T: TableRow + Serialize>(
    output: &TableLocation,
    table_name: &str,
) -> Result<TableDigest, TallyError> {
    let rows: Vec<T> = SqliteStore::read(&output.db_path, table_name)?;
    let bytes = canonical_bytes(&rows)?;
    let header = canonical_header(&bytes)?;

    Ok(TableDigest {
        table: table_name.to_string(),
        rows: header.row_count,
        checksum: format!("{:016x}", canonical_checksum(&bytes)),
        blake3: canonical_crypto_hash(&rows)?,
    })
}

/// Digest the echoed table and the three views at `output`, in write order.
pub fn digest_outputs(output: &TableLocation) -> Result<Vec<TableDigest>, TallyError> {
    Ok(vec![
        digest_table::<InteractionRecord>(output, &output.table_name)?,
        digest_table::<PairCountRow>(output, PAIR_COUNTS_TABLE)?,
        digest_table::<DailyTotalRow>(output, DAILY_TOTALS_TABLE)?,
        digest_table::<UserTotalRow>(output, TOP_USERS_TABLE)?,
    ])
}
