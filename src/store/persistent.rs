use crate::core::cache::{Cache, CacheEntry};
use crate::store::{JsonStoreExt, KeyValueStore};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// A TTL cache kept as a single JSON blob under one store key.
///
/// The blob is read on every access so separate processes sharing the same
/// store observe each other's entries.
pub struct StoreCache<V> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Duration,
    // Serializes read-modify-write cycles on the blob
    lock: Mutex<()>,
    _marker: PhantomData<V>,
}

impl<V> StoreCache<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: &str, ttl: Duration) -> Self {
        Self {
            store,
            key: key.to_string(),
            ttl,
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    fn read_blob(&self) -> HashMap<String, CacheEntry<V>> {
        self.store.load(&self.key).unwrap_or_default()
    }

    fn write_blob(&self, blob: &HashMap<String, CacheEntry<V>>) {
        self.store.save(&self.key, blob);
    }
}

#[async_trait]
impl<V> Cache<String, V> for StoreCache<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn get(&self, key: &String) -> Option<V> {
        let _guard = self.lock.lock().await;
        let mut blob = self.read_blob();
        match blob.get(key) {
            Some(entry) if entry.is_fresh(self.ttl) => {
                debug!("Cache HIT for key: {:?}", key);
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!("Cache entry expired for key: {:?}", key);
                blob.remove(key);
                self.write_blob(&blob);
                None
            }
            None => {
                debug!("Cache MISS for key: {:?}", key);
                None
            }
        }
    }

    async fn put(&self, key: String, value: V) {
        let _guard = self.lock.lock().await;
        let mut blob = self.read_blob();
        debug!("Cache PUT for key: {:?}", key);
        blob.insert(key, CacheEntry::new(value));
        self.write_blob(&blob);
    }

    async fn remove(&self, key: &String) {
        let _guard = self.lock.lock().await;
        let mut blob = self.read_blob();
        if blob.remove(key).is_some() {
            self.write_blob(&blob);
        }
        debug!("Cache REMOVE for key: {:?}", key);
    }

    async fn clear(&self) {
        let _guard = self.lock.lock().await;
        self.write_blob(&HashMap::new());
        debug!("Cache CLEAR");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::disk::DiskStore;
    use crate::store::keys;
    use crate::store::memory::MemoryStore;
    use tempfile::tempdir;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_store_cache_get_put() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = StoreCache::<Vec<f64>>::new(store, keys::MARKET_CACHE, Duration::from_secs(60));

        assert!(cache.get(&"wheat-all-all".to_string()).await.is_none());
        cache.put("wheat-all-all".to_string(), vec![1.5, 2.5]).await;
        assert_eq!(
            cache.get(&"wheat-all-all".to_string()).await,
            Some(vec![1.5, 2.5])
        );
    }

    #[tokio::test]
    async fn test_store_cache_ttl_expiration_evicts() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = StoreCache::<i32>::new(
            Arc::clone(&store),
            keys::MARKET_CACHE,
            Duration::from_millis(10),
        );

        cache.put("k".to_string(), 1).await;
        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&"k".to_string()).await.is_none());

        let blob: HashMap<String, CacheEntry<i32>> = store.load(keys::MARKET_CACHE).unwrap();
        assert!(blob.is_empty());
    }

    #[tokio::test]
    async fn test_store_cache_shared_across_instances() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(DiskStore::open(dir.path()).unwrap());

        let writer = StoreCache::<i32>::new(
            Arc::clone(&store),
            keys::MARKET_CACHE,
            Duration::from_secs(60),
        );
        writer.put("all-all-all".to_string(), 7).await;

        let reader = StoreCache::<i32>::new(store, keys::MARKET_CACHE, Duration::from_secs(60));
        assert_eq!(reader.get(&"all-all-all".to_string()).await, Some(7));

        reader.clear().await;
        assert!(writer.get(&"all-all-all".to_string()).await.is_none());
    }
}
