//! Configuration Change Monitor
//!
//! Remembers the configuration-version fingerprint of every discovered
//! cluster, persists it together with the discovery parameters, and polls
//! the manager in the background for drift.
//!
//! ## Lifecycle per `(address, cluster)`
//!
//! - **register**: after a successful discovery the parameters and the
//!   fingerprint are stored in memory and written to disk.
//! - **poll**: once per interval the current fingerprint is fetched through
//!   a [`ConfigVersionSource`] and compared with the stored one. Drift is
//!   reported to every listener; the stored fingerprint is left alone until
//!   discovery runs again and re-registers the cluster.
//! - **clear**: [`ConfigurationMonitor::clear_cache`] forgets the fingerprint
//!   and deletes its record.
//!
//! Records are reloaded at construction, so clusters deployed before a
//! restart keep being monitored without rediscovery.
//!
//! ## Shutdown
//!
//! [`ConfigurationMonitor::stop`] clears the running flag of the current poll
//! task and wakes it if it is sleeping. A poll pass already in flight
//! finishes first, so the task exits at most one interval after the request.
//! Each started task has its own flag, so a restart never revives an old loop.

mod fingerprint;
mod persistence;

pub use fingerprint::ConfigFingerprint;
pub use persistence::{PersistedState, RecordStore};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use gateway_config::{defaults, GatewayConfig};

use crate::error::Result;
use crate::identity::{ClusterKey, DiscoveryConfig};
use crate::model::Cluster;

/// Notified when a monitored cluster's configuration drifted
pub trait ConfigurationChangeListener: Send + Sync {
    fn on_configuration_change(&self, source_address: &str, cluster_name: &str);
}

/// Fetches the current fingerprint of a cluster
#[async_trait]
pub trait ConfigVersionSource: Send + Sync {
    async fn current_versions(&self, config: &DiscoveryConfig) -> Result<ConfigFingerprint>;
}

pub struct ConfigurationMonitor {
    store: RecordStore,
    interval: Duration,
    fingerprints: RwLock<HashMap<ClusterKey, ConfigFingerprint>>,
    configs: RwLock<HashMap<ClusterKey, DiscoveryConfig>>,
    listeners: RwLock<Vec<Arc<dyn ConfigurationChangeListener>>>,
    task: Mutex<Option<PollTask>>,
}

impl ConfigurationMonitor {
    /// Records live in `<data_dir>/clusters`
    pub fn new(data_dir: &Path, interval: Duration) -> Self {
        let store = RecordStore::new(data_dir.join(defaults::monitor::CLUSTERS_DIR));
        let monitor = Self {
            store,
            interval,
            fingerprints: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            task: Mutex::new(None),
        };
        monitor.load_persisted();
        monitor
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.gateway.data_dir, config.monitor.interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn load_persisted(&self) {
        let state = self.store.load();
        let mut configs = self.configs.write();
        for config in state.configs {
            if let Some(key) = config.key() {
                debug!("Restored discovery parameters for {}", key);
                configs.insert(key, config);
            }
        }
        drop(configs);

        let mut fingerprints = self.fingerprints.write();
        for (key, fingerprint) in state.fingerprints {
            debug!("Restored configuration versions for {}", key);
            fingerprints.insert(key, fingerprint);
        }
    }

    /// Record a freshly discovered cluster, replacing any previous state
    pub fn register(&self, config: &DiscoveryConfig, cluster: &Cluster) {
        let Some(key) = config.key() else {
            warn!("Not monitoring cluster {}: discovery address or name missing", cluster.name());
            return;
        };
        let fingerprint = cluster.config_versions();

        if let Err(e) = self.store.save_config(&key, config) {
            error!("Failed to persist discovery parameters for {}: {}", key, e);
        }
        if let Err(e) = self.store.save_versions(&key, &fingerprint) {
            error!("Failed to persist configuration versions for {}: {}", key, e);
        }

        self.configs.write().insert(key.clone(), config.clone());
        self.fingerprints.write().insert(key.clone(), fingerprint);
        info!("Monitoring configuration of {}", key);
    }

    pub fn fingerprint(&self, address: &str, cluster: &str) -> Option<ConfigFingerprint> {
        self.fingerprints
            .read()
            .get(&ClusterKey::new(address, cluster))
            .cloned()
    }

    pub fn discovery_config(&self, address: &str, cluster: &str) -> Option<DiscoveryConfig> {
        self.configs
            .read()
            .get(&ClusterKey::new(address, cluster))
            .cloned()
    }

    pub fn tracked_clusters(&self) -> Vec<ClusterKey> {
        let mut keys: Vec<_> = self.fingerprints.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Forget a cluster's fingerprint and delete its record
    pub fn clear_cache(&self, address: &str, cluster: &str) {
        let key = ClusterKey::new(address, cluster);
        self.fingerprints.write().remove(&key);
        if let Err(e) = self.store.remove_versions(&key) {
            error!("Failed to remove configuration versions for {}: {}", key, e);
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn ConfigurationChangeListener>) {
        self.listeners.write().push(listener);
    }

    fn notify_listeners(&self, key: &ClusterKey) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            debug!("Notifying listener of change in {}", key);
            listener.on_configuration_change(&key.address, &key.cluster);
        }
    }

    /// One comparison pass over every tracked cluster; returns the drifted ones
    pub async fn poll_once(&self, source: &dyn ConfigVersionSource) -> Vec<ClusterKey> {
        // Snapshot so no lock is held across the remote calls
        let snapshot: Vec<(ClusterKey, ConfigFingerprint)> = self
            .fingerprints
            .read()
            .iter()
            .filter(|(_, fingerprint)| !fingerprint.is_empty())
            .map(|(key, fingerprint)| (key.clone(), fingerprint.clone()))
            .collect();

        let mut drifted = Vec::new();
        for (key, stored) in snapshot {
            let config = self
                .configs
                .read()
                .get(&key)
                .cloned()
                .unwrap_or_else(|| DiscoveryConfig::new(key.address.as_str(), key.cluster.as_str()));

            let current = match source.current_versions(&config).await {
                Ok(current) => current,
                Err(e) => {
                    warn!("Failed to check configuration versions of {}: {}", key, e);
                    continue;
                }
            };

            if current.is_empty() {
                debug!("No configuration versions reported for {}", key);
                continue;
            }

            if stored.differs_from(&current) {
                info!("Configuration of {} changed", key);
                self.notify_listeners(&key);
                drifted.push(key);
            }
        }

        drifted
    }

    /// Spawn the poll loop; a second call while running does nothing
    pub fn start(self: &Arc<Self>, source: Arc<dyn ConfigVersionSource>) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(PollTask::is_active) {
            debug!("Configuration monitor already running");
            return;
        }
        // A stopped loop may still be finishing its pass
        if let Some(stale) = task.take() {
            debug!("Discarding stopped configuration monitor task");
            stale.handle.abort();
        }

        let active = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());
        let monitor = Arc::clone(self);
        let handle = tokio::spawn({
            let active = Arc::clone(&active);
            let wake = Arc::clone(&wake);
            async move {
                info!("Configuration monitor polling every {:?}", monitor.interval);
                while active.load(Ordering::SeqCst) {
                    monitor.poll_once(source.as_ref()).await;
                    if !active.load(Ordering::SeqCst) {
                        break;
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(monitor.interval) => {}
                        _ = wake.notified() => debug!("Configuration monitor woken"),
                    }
                }
                info!("Configuration monitor stopped");
            }
        });

        *task = Some(PollTask { active, wake, handle });
    }

    /// Request the poll loop to end
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().as_ref() {
            task.active.store(false, Ordering::SeqCst);
            task.wake.notify_one();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(PollTask::is_active)
    }

    /// Stop and wait for the poll task to exit
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.handle.await {
                error!("Configuration monitor task failed: {}", e);
            }
        }
    }
}

/// One spawned poll loop; `active` belongs to this loop alone
struct PollTask {
    active: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl PollTask {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
