//! TTL cache abstraction used for market prices

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value stamped with the time it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self::at(data, Utc::now())
    }

    pub fn at(data: T, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    /// An entry is valid while `now - timestamp < ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age < ttl,
            // A ttl too large for chrono never expires
            Err(_) => true,
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(Utc::now(), ttl)
    }
}

/// Key-value cache with a time-to-live fixed at construction.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V);
    async fn remove(&self, key: &K);
    async fn clear(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_freshness_boundary() {
        let stored = Utc::now();
        let entry = CacheEntry::at(42, stored);
        let ttl = Duration::from_secs(7200);

        assert!(entry.is_fresh_at(stored, ttl));
        assert!(entry.is_fresh_at(stored + chrono::Duration::seconds(7199), ttl));
        // Exactly ttl old is already stale
        assert!(!entry.is_fresh_at(stored + chrono::Duration::seconds(7200), ttl));
        assert!(!entry.is_fresh_at(stored + chrono::Duration::hours(3), ttl));
    }

    #[test]
    fn test_entry_serializes_with_timestamp() {
        let entry = CacheEntry::new(vec![1, 2, 3]);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"data\":[1,2,3]"));
        assert!(json.contains("\"timestamp\""));

        let back: CacheEntry<Vec<i32>> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
