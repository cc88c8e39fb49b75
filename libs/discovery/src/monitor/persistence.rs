//! On-disk records of monitored clusters
//!
//! One directory, two files per cluster, both flat TOML key/value tables:
//!
//! - `<address>-<cluster>.conf`: the discovery parameters
//! - `<address>-<cluster>.ver`: `configType -> version` plus the identifying keys
//!
//! `:` and `/` in the address become `_` in file names.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use super::ConfigFingerprint;
use crate::error::Result;
use crate::identity::{ClusterKey, DiscoveryConfig};

const HEADER: &str = "# Generated File. Do Not Edit!\n\n";

const CONFIG_EXT: &str = "conf";
const VERSIONS_EXT: &str = "ver";

const PROP_CLUSTER_PREFIX: &str = "cluster.";
const PROP_CLUSTER_NAME: &str = "cluster.name";
const PROP_CLUSTER_SOURCE: &str = "cluster.source";
const PROP_CLUSTER_USER: &str = "cluster.user";
const PROP_CLUSTER_ALIAS: &str = "cluster.pwd.alias";

/// Everything found on disk at startup
#[derive(Debug, Default)]
pub struct PersistedState {
    pub configs: Vec<DiscoveryConfig>,
    pub fingerprints: Vec<(ClusterKey, ConfigFingerprint)>,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self, key: &ClusterKey) -> PathBuf {
        self.record_path(key, CONFIG_EXT)
    }

    pub fn versions_path(&self, key: &ClusterKey) -> PathBuf {
        self.record_path(key, VERSIONS_EXT)
    }

    fn record_path(&self, key: &ClusterKey, ext: &str) -> PathBuf {
        let address = key.address.replace([':', '/'], "_");
        self.dir.join(format!("{}-{}.{}", address, key.cluster, ext))
    }

    pub fn save_config(&self, key: &ClusterKey, config: &DiscoveryConfig) -> Result<()> {
        let mut record = identity_record(key);
        if let Some(user) = &config.user {
            record.insert(PROP_CLUSTER_USER.to_string(), user.clone());
        }
        if let Some(alias) = &config.password_alias {
            record.insert(PROP_CLUSTER_ALIAS.to_string(), alias.clone());
        }
        self.write_record(&self.config_path(key), &record)
    }

    pub fn save_versions(&self, key: &ClusterKey, fingerprint: &ConfigFingerprint) -> Result<()> {
        let mut record: BTreeMap<String, String> = fingerprint.clone().into();
        record.extend(identity_record(key));
        self.write_record(&self.versions_path(key), &record)
    }

    pub fn remove_versions(&self, key: &ClusterKey) -> Result<()> {
        let path = self.versions_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Removed {:?}", path);
        }
        Ok(())
    }

    fn write_record(&self, path: &Path, record: &BTreeMap<String, String>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let body = toml::to_string(record)?;
        fs::write(path, format!("{}{}", HEADER, body))?;
        debug!("Persisted {:?}", path);
        Ok(())
    }

    /// Unreadable records are logged and skipped
    pub fn load(&self) -> PersistedState {
        let mut state = PersistedState::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return state,
            Err(e) => {
                error!("Failed to list cluster records in {:?}: {}", self.dir, e);
                return state;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if ext != Some(CONFIG_EXT) && ext != Some(VERSIONS_EXT) {
                continue;
            }

            let record = match read_record(&path) {
                Ok(record) => record,
                Err(e) => {
                    error!("Failed to load cluster record {:?}: {}", path, e);
                    continue;
                }
            };

            let (Some(cluster), Some(source)) =
                (record.get(PROP_CLUSTER_NAME), record.get(PROP_CLUSTER_SOURCE))
            else {
                warn!("Cluster record {:?} lacks its identifying keys", path);
                continue;
            };
            let key = ClusterKey::new(source.as_str(), cluster.as_str());

            if ext == Some(CONFIG_EXT) {
                state.configs.push(DiscoveryConfig {
                    address: Some(key.address),
                    cluster: Some(key.cluster),
                    user: record.get(PROP_CLUSTER_USER).cloned(),
                    password_alias: record.get(PROP_CLUSTER_ALIAS).cloned(),
                });
            } else {
                let fingerprint = record
                    .into_iter()
                    .filter(|(k, _)| !k.starts_with(PROP_CLUSTER_PREFIX))
                    .collect();
                state.fingerprints.push((key, fingerprint));
            }
        }

        state
    }
}

fn identity_record(key: &ClusterKey) -> BTreeMap<String, String> {
    BTreeMap::from([
        (PROP_CLUSTER_NAME.to_string(), key.cluster.clone()),
        (PROP_CLUSTER_SOURCE.to_string(), key.address.clone()),
    ])
}

fn read_record(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_names_replace_path_unsafe_characters() {
        let store = RecordStore::new("/var/gateway/clusters");
        let key = ClusterKey::new("http://manager:7180", "cluster-1");

        assert_eq!(
            store.config_path(&key),
            PathBuf::from("/var/gateway/clusters/http___manager_7180-cluster-1.conf")
        );
        assert_eq!(
            store.versions_path(&key),
            PathBuf::from("/var/gateway/clusters/http___manager_7180-cluster-1.ver")
        );
    }

    #[test]
    fn test_records_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("clusters"));
        let key = ClusterKey::new("http://manager:7180", "cluster-1");

        let config = DiscoveryConfig::new("http://manager:7180", "cluster-1")
            .with_user("admin")
            .with_password_alias("cluster-1.pwd");
        let mut fingerprint = ConfigFingerprint::new();
        fingerprint.insert("hdfs-site", "4");
        fingerprint.insert("core-site", "2");

        store.save_config(&key, &config).unwrap();
        store.save_versions(&key, &fingerprint).unwrap();

        let written = fs::read_to_string(store.versions_path(&key)).unwrap();
        assert!(written.starts_with("# Generated File. Do Not Edit!"));

        let state = store.load();
        assert_eq!(state.configs, vec![config]);
        assert_eq!(state.fingerprints, vec![(key.clone(), fingerprint)]);

        store.remove_versions(&key).unwrap();
        assert!(!store.versions_path(&key).exists());
        assert!(store.load().fingerprints.is_empty());
    }

    #[test]
    fn test_load_skips_foreign_and_broken_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("broken-c1.conf"), "this is = = not toml").unwrap();
        fs::write(dir.path().join("anonymous-c1.ver"), "\"hdfs-site\" = \"1\"\n").unwrap();

        let state = RecordStore::new(dir.path()).load();
        assert!(state.configs.is_empty());
        assert!(state.fingerprints.is_empty());
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let dir = tempdir().unwrap();
        let state = RecordStore::new(dir.path().join("absent")).load();
        assert!(state.configs.is_empty());
    }
}
