pub mod disk;
pub mod memory;
pub mod persistent;

use crate::core::config::AppConfig;
use anyhow::Result;
use disk::DiskStore;
use memory::MemoryStore;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::{debug, warn};

/// Keys of the flat persisted namespace.
pub mod keys {
    pub const LANGUAGE: &str = "language";
    pub const DIRECTION: &str = "direction";
    pub const MISSING_TRANSLATIONS: &str = "missing_translations";
    pub const MARKET_CACHE: &str = "market_cache";
    pub const SELLING_OFFERS: &str = "selling_offers";
    pub const PRICE_ALERTS: &str = "price_alerts";
    pub const API_CALL_LOG: &str = "api_call_log";
    pub const USER_POINTS: &str = "user_points";
    pub const TRANSLATION_OVERRIDES: &str = "translation_overrides";
}

/// A flat byte-valued key-value namespace.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON helpers over any store. Failures are logged and swallowed so callers
/// keep running on in-memory defaults.
pub trait JsonStoreExt {
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T>;
    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool;
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Storage read failed");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored value is not valid JSON for its type");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let res = serde_json::to_vec(value)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| self.set(key, &bytes));
        match res {
            Ok(()) => {
                debug!(key, "Stored value");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Storage write failed");
                false
            }
        }
    }
}

/// Opens the on-disk store under the configured data path, falling back to an
/// in-memory store when the disk store is unavailable.
pub fn open_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    let disk = config
        .default_data_path()
        .and_then(|path| DiskStore::open(&path.join("store")));
    match disk {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Falling back to in-memory storage");
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(anyhow!("quota exceeded"))
        }
        fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
    }

    #[test]
    fn test_json_round_trip_through_memory_store() {
        let store = MemoryStore::new();
        assert!(store.save(keys::USER_POINTS, &30u64));
        assert_eq!(store.load::<u64>(keys::USER_POINTS), Some(30));
        assert_eq!(store.load::<u64>(keys::LANGUAGE), None);
    }

    #[test]
    fn test_storage_errors_degrade() {
        let store = BrokenStore;
        assert!(!store.save(keys::USER_POINTS, &1u64));
        assert_eq!(store.load::<u64>(keys::USER_POINTS), None);
    }

    #[test]
    fn test_corrupt_value_reads_as_missing() {
        let store = MemoryStore::new();
        store.set(keys::PRICE_ALERTS, b"{not json").unwrap();
        assert!(store.load::<Vec<String>>(keys::PRICE_ALERTS).is_none());
    }

    #[test]
    fn test_dyn_store_supports_json_helpers() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.save(keys::LANGUAGE, "ar");
        assert_eq!(store.load::<String>(keys::LANGUAGE).as_deref(), Some("ar"));
    }
}
