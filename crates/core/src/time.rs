//! The single conversion boundary for on-chain timestamps.
//!
//! Contracts and the indexer report unix seconds. Everything past this
//! module works with `DateTime<Utc>`.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{CoreError, CoreResult};
use crate::uint::U256;

/// Canonical internal timestamp
pub type Timestamp = DateTime<Utc>;

/// Convert unix seconds reported by the chain into a timestamp
pub fn timestamp_from_chain(seconds: u64) -> CoreResult<Timestamp> {
    let seconds = i64::try_from(seconds)
        .map_err(|_| CoreError::InvalidTimestamp(seconds.to_string()))?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| CoreError::InvalidTimestamp(seconds.to_string()))
}

/// Convert a `uint256` seconds field into a timestamp
pub fn timestamp_from_chain_u256(seconds: U256) -> CoreResult<Timestamp> {
    if seconds.bits() > 64 {
        return Err(CoreError::InvalidTimestamp(seconds.to_string()));
    }
    timestamp_from_chain(seconds.low_u64())
}

/// Convert a timestamp into unix seconds for the chain, dropping sub-second precision
pub fn timestamp_to_chain(timestamp: &Timestamp) -> CoreResult<u64> {
    u64::try_from(timestamp.timestamp())
        .map_err(|_| CoreError::InvalidTimestamp(timestamp.to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_seconds() {
        let ts = timestamp_from_chain(1_700_000_000).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(timestamp_to_chain(&ts).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_rejects_unrepresentable() {
        assert!(timestamp_from_chain(u64::MAX).is_err());
        assert!(timestamp_from_chain_u256(U256::MAX).is_err());
        let before_epoch = Utc.timestamp_opt(-10, 0).single().unwrap();
        assert!(timestamp_to_chain(&before_epoch).is_err());
    }
}
