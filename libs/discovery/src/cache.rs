//! Discovery Cache
//!
//! TTL cache of discovered clusters keyed by discovery identity. Expiry is
//! checked lazily on read; an expired entry stays in the map until the next
//! successful discovery overwrites it or it is invalidated.
//!
//! Concurrent misses for one key are not coalesced: every caller that sees
//! a miss performs its own remote discovery.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use gateway_config::DiscoverySettings;

use crate::identity::ClusterKey;
use crate::model::Cluster;
use crate::monitor::ConfigurationChangeListener;

#[derive(Debug, Clone)]
struct CacheEntry {
    cluster: Arc<Cluster>,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct DiscoveryCache {
    entries: DashMap<ClusterKey, CacheEntry>,
    ttl: RwLock<Duration>,
}

impl DiscoveryCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: RwLock::new(ttl),
        }
    }

    pub fn new(settings: &DiscoverySettings) -> Self {
        Self::with_ttl(settings.cache_ttl())
    }

    pub fn ttl(&self) -> Duration {
        *self.ttl.read()
    }

    /// Applies to existing entries too, since expiry is computed on read
    pub fn set_ttl(&self, ttl: Duration) {
        *self.ttl.write() = ttl;
    }

    pub fn get(&self, key: &ClusterKey) -> Option<Arc<Cluster>> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl() {
            debug!("Cached discovery of {} expired", key);
            return None;
        }
        Some(Arc::clone(&entry.cluster))
    }

    pub fn put(&self, key: ClusterKey, cluster: Arc<Cluster>) {
        debug!("Caching discovery of {}", key);
        self.entries.insert(
            key,
            CacheEntry {
                cluster,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &ClusterKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Drops a cluster from the cache when its configuration drifts
#[derive(Debug, Clone)]
pub struct CacheInvalidatingListener {
    cache: Arc<DiscoveryCache>,
}

impl CacheInvalidatingListener {
    pub fn new(cache: Arc<DiscoveryCache>) -> Self {
        Self { cache }
    }
}

impl ConfigurationChangeListener for CacheInvalidatingListener {
    fn on_configuration_change(&self, source_address: &str, cluster_name: &str) {
        let key = ClusterKey::new(source_address, cluster_name);
        if self.cache.invalidate(&key) {
            debug!("Invalidated cached discovery of {}", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::Mappings;

    fn cluster(name: &str) -> Arc<Cluster> {
        let mappings = Mappings::builtin().unwrap();
        Arc::new(Cluster::builder(name).build(mappings.url_factory(), mappings.ha()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = DiscoveryCache::with_ttl(Duration::from_secs(1));
        let key = ClusterKey::new("http://m:7180", "c1");
        cache.put(key.clone(), cluster("c1"));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(cache.get(&key).is_some());

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(cache.get(&key).is_none());
        // Lazy expiry leaves the entry in place
        assert_eq!(cache.len(), 1);

        cache.put(key.clone(), cluster("c1"));
        assert!(cache.get(&key).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_ttl_applies_to_existing_entries() {
        let cache = DiscoveryCache::with_ttl(Duration::from_secs(600));
        let key = ClusterKey::new("http://m:7180", "c1");
        cache.put(key.clone(), cluster("c1"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(cache.get(&key).is_some());

        cache.set_ttl(Duration::from_secs(2));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_same_cluster_name_on_two_managers() {
        let cache = DiscoveryCache::with_ttl(Duration::from_secs(600));
        let first = ClusterKey::new("http://m1:7180", "prod");
        let second = ClusterKey::new("http://m2:7180", "prod");
        cache.put(first.clone(), cluster("prod"));

        assert!(cache.get(&first).is_some());
        assert!(cache.get(&second).is_none());
    }

    #[test]
    fn test_listener_invalidates_drifted_cluster() {
        let cache = Arc::new(DiscoveryCache::with_ttl(Duration::from_secs(600)));
        let key = ClusterKey::new("http://m:7180", "c1");
        let other = ClusterKey::new("http://m:7180", "c2");
        cache.put(key.clone(), cluster("c1"));
        cache.put(other.clone(), cluster("c2"));

        CacheInvalidatingListener::new(Arc::clone(&cache)).on_configuration_change("http://m:7180", "c1");

        assert!(cache.get(&key).is_none());
        assert!(cache.get(&other).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
