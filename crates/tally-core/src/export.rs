//! # Canonical Export Module
//!
//! SQLite files are NOT guaranteed bit-identical across runs (page layout,
//! freelists, journal state). Equality of pipeline outputs is therefore
//! checked on a canonical encoding of the table *contents*: a postcard
//! header followed by the postcard-encoded rows, in stored order.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [CanonicalHeader (postcard)] [rows (postcard)]
//! ```

use crate::TallyError;
use serde::{Deserialize, Serialize};

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for canonical table exports.
pub const CANONICAL_MAGIC: [u8; 4] = *b"TALY";

/// Current canonical format version.
pub const CANONICAL_VERSION: u8 = 1;

/// Header preceding the encoded rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    /// Magic bytes to identify the format.
    pub magic: [u8; 4],

    /// Format version for compatibility.
    pub version: u8,

    /// Number of rows in the export.
    pub row_count: u64,
}

impl CanonicalHeader {
    /// Create a new header for `row_count` rows.
    #[must_use]
    pub fn new(row_count: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            row_count,
        }
    }
}

// =============================================================================
// EXPORT FUNCTIONS
// =============================================================================

/// Encode a table in canonical form.
///
/// Two tables encode to the same bytes iff they hold equal rows in the same
/// order.
///
/// # Errors
///
/// Returns `TallyError::SerializationError` if serialization fails.
pub fn canonical_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, TallyError> {
    let header = CanonicalHeader::new(rows.len() as u64);

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| TallyError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(&rows)
        .map_err(|e| TallyError::SerializationError(format!("Rows: {}", e)))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);

    Ok(result)
}

/// Read the header of a canonical export.
pub fn canonical_header(data: &[u8]) -> Result<CanonicalHeader, TallyError> {
    let len_bytes: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| TallyError::SerializationError("Data too short".to_string()))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let header_bytes = data
        .get(4..4 + header_len)
        .ok_or_else(|| TallyError::SerializationError("Header truncated".to_string()))?;
    let header: CanonicalHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| TallyError::SerializationError(format!("Header: {}", e)))?;

    if header.magic != CANONICAL_MAGIC {
        return Err(TallyError::SerializationError(
            "Invalid magic bytes".to_string(),
        ));
    }
    if header.version != CANONICAL_VERSION {
        return Err(TallyError::SerializationError(format!(
            "Unsupported version: {} (expected {})",
            header.version, CANONICAL_VERSION
        )));
    }

    Ok(header)
}

/// Compute a 64-bit FNV-1a checksum of canonical bytes.
///
/// Fast equality check between runs. NOT collision resistant; use
/// `canonical_crypto_hash` where that matters.
#[must_use]
pub fn canonical_checksum(data: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    data.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// Compute a BLAKE3 hash of a table's canonical encoding, as 64 hex chars.
///
/// # Requires
///
/// This function is only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash<T: Serialize>(rows: &[T]) -> Result<String, TallyError> {
    let data = canonical_bytes(rows)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InteractionCount, UserId, UserTotalRow};

    fn totals(pairs: &[(i64, i64)]) -> Vec<UserTotalRow> {
        pairs
            .iter()
            .map(|&(user, count)| UserTotalRow {
                user_id: UserId(user),
                interaction_count: InteractionCount::new(count),
            })
            .collect()
    }

    #[test]
    fn canonical_bytes_deterministic() {
        let rows = totals(&[(1, 3), (2, 1)]);
        let a = canonical_bytes(&rows).expect("encode");
        let b = canonical_bytes(&rows).expect("encode");
        assert_eq!(a, b);
        assert_eq!(canonical_checksum(&a), canonical_checksum(&b));
    }

    #[test]
    fn canonical_bytes_depend_on_order() {
        let a = canonical_bytes(&totals(&[(1, 3), (2, 1)])).expect("encode");
        let b = canonical_bytes(&totals(&[(2, 1), (1, 3)])).expect("encode");
        assert_ne!(canonical_checksum(&a), canonical_checksum(&b));
    }

    #[test]
    fn header_roundtrip() {
        let data = canonical_bytes(&totals(&[(1, 3), (2, 1), (3, 1)])).expect("encode");
        let header = canonical_header(&data).expect("header");
        assert_eq!(header, CanonicalHeader::new(3));
    }

    #[test]
    fn empty_table_has_header_only_payload() {
        let data = canonical_bytes::<UserTotalRow>(&[]).expect("encode");
        assert_eq!(canonical_header(&data).expect("header").row_count, 0);
    }

    #[test]
    fn header_rejects_garbage() {
        assert!(canonical_header(&[]).is_err());
        assert!(canonical_header(&[200, 0, 0, 0, 1]).is_err());
        assert!(canonical_header(&[1, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn checksum_of_empty_input_is_offset_basis() {
        assert_eq!(canonical_checksum(&[]), 0xcbf2_9ce4_8422_2325);
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn crypto_hash_is_hex_and_stable() {
        let rows = totals(&[(5, 9)]);
        let a = canonical_crypto_hash(&rows).expect("hash");
        let b = canonical_crypto_hash(&rows).expect("hash");
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }
}
