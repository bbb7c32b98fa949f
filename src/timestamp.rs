//! Card creation time decoding
//!
//! Trello ids are Mongo-style object ids: the first 4 bytes (8 hex digits)
//! are the creation time in seconds since the Unix epoch.

use crate::error::{Result, TrimmerError};
use crate::model::UnitId;
use chrono::{DateTime, Utc};

/// Width of the hex timestamp prefix
const PREFIX_LEN: usize = 8;

/// Decode the creation instant embedded in a card id
pub fn decode_created_at(id: &UnitId) -> Result<DateTime<Utc>> {
    let malformed = |reason: String| TrimmerError::MalformedIdentifier {
        id: id.to_string(),
        reason,
    };

    let prefix = id
        .as_str()
        .get(..PREFIX_LEN)
        .ok_or_else(|| malformed(format!("needs at least {PREFIX_LEN} hex characters")))?;

    let mut bytes = [0u8; PREFIX_LEN / 2];
    hex::decode_to_slice(prefix, &mut bytes)
        .map_err(|e| malformed(format!("invalid hex prefix '{prefix}': {e}")))?;

    let seconds = u32::from_be_bytes(bytes);
    DateTime::<Utc>::from_timestamp(i64::from(seconds), 0)
        .ok_or_else(|| malformed(format!("timestamp {seconds} out of range")))
}
