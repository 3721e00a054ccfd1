//! Stored Entry Module
//!
//! Value plus absolute expiry, as kept by the bundled engines.

use serde::{Deserialize, Serialize};

// == Stored Entry ==
/// A single record with its expiry metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<V> {
    /// The stored value
    pub val: V,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl<V> StoredEntry<V> {
    // == Constructor ==
    /// Creates an entry expiring `ttl_ms` milliseconds after `now_ms`.
    pub fn new(val: V, ttl_ms: Option<u64>, now_ms: i64) -> Self {
        Self {
            val,
            expires_at: expiry_from_ttl(now_ms, ttl_ms),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiry.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    /// Replaces the expiry with `ttl_ms` from `now_ms`.
    pub fn reset_ttl(&mut self, ttl_ms: u64, now_ms: i64) {
        self.expires_at = expiry_from_ttl(now_ms, Some(ttl_ms));
    }
}

// == Utility Functions ==
/// Absolute expiry for a relative TTL, saturating at the far future.
pub fn expiry_from_ttl(now_ms: i64, ttl_ms: Option<u64>) -> Option<i64> {
    ttl_ms.map(|ttl| now_ms.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX)))
}

/// Turns the signed output of `ts_to_ttl` into a load-time TTL.
///
/// Returns `None` when the entry is already expired, `Some(None)` when it
/// never expires.
pub(crate) fn live_ttl(remaining: Option<i64>) -> Option<Option<u64>> {
    match remaining {
        None => Some(None),
        Some(ms) if ms > 0 => Some(Some(ms as u64)),
        Some(_) => None,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = StoredEntry::new("test_value", None, 1_000);

        assert_eq!(entry.val, "test_value");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired(i64::MAX));
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = StoredEntry::new("test_value", Some(500), 1_000);

        assert_eq!(entry.expires_at, Some(1_500));
        assert!(!entry.is_expired(1_499));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = StoredEntry::new("test", Some(0), 1_000);
        assert!(entry.is_expired(1_000), "Entry should be expired at boundary");
    }

    #[test]
    fn test_reset_ttl() {
        let mut entry = StoredEntry::new(1u8, Some(10), 0);
        entry.reset_ttl(5_000, 100);
        assert_eq!(entry.expires_at, Some(5_100));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        assert_eq!(expiry_from_ttl(1_000, Some(u64::MAX)), Some(i64::MAX));
    }

    #[test]
    fn test_live_ttl() {
        assert_eq!(live_ttl(None), Some(None));
        assert_eq!(live_ttl(Some(250)), Some(Some(250)));
        assert_eq!(live_ttl(Some(0)), None);
        assert_eq!(live_ttl(Some(-10)), None);
    }
}
