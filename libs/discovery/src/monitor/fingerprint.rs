use std::collections::BTreeMap;

/// `configType -> version` of one cluster, compared only for drift
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFingerprint(BTreeMap<String, String>);

impl ConfigFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config_type: impl Into<String>, version: impl Into<String>) {
        self.0.insert(config_type.into(), version.into());
    }

    pub fn get(&self, config_type: &str) -> Option<&str> {
        self.0.get(config_type).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A size mismatch or any differing version is drift
    pub fn differs_from(&self, current: &ConfigFingerprint) -> bool {
        if self.0.len() != current.0.len() {
            return true;
        }
        self.0
            .iter()
            .any(|(config_type, version)| current.0.get(config_type) != Some(version))
    }
}

impl FromIterator<(String, String)> for ConfigFingerprint {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for ConfigFingerprint {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<ConfigFingerprint> for BTreeMap<String, String> {
    fn from(fingerprint: ConfigFingerprint) -> Self {
        fingerprint.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fingerprint(pairs: &[(&str, &str)]) -> ConfigFingerprint {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_drift_cases() {
        let stored = fingerprint(&[("hdfs-site", "1"), ("core-site", "2")]);

        assert!(!stored.differs_from(&fingerprint(&[("core-site", "2"), ("hdfs-site", "1")])));
        assert!(stored.differs_from(&fingerprint(&[("hdfs-site", "1"), ("core-site", "3")])));
        assert!(stored.differs_from(&fingerprint(&[("hdfs-site", "1")])));
        assert!(stored.differs_from(&fingerprint(&[("hdfs-site", "1"), ("yarn-site", "2")])));
    }

    proptest! {
        #[test]
        fn prop_insertion_order_never_drifts(
            entries in proptest::collection::btree_map("[a-z]{1,8}-site", "[0-9]{1,4}", 0..16)
        ) {
            let forward: ConfigFingerprint = entries.clone().into_iter().collect();
            let reversed: ConfigFingerprint = entries.clone().into_iter().rev().collect();

            prop_assert!(!forward.differs_from(&reversed));
            prop_assert!(!reversed.differs_from(&forward));
        }

        #[test]
        fn prop_single_changed_version_drifts(
            entries in proptest::collection::btree_map("[a-z]{1,8}-site", "[0-9]{1,4}", 1..16),
            pick in any::<proptest::sample::Index>()
        ) {
            let stored: ConfigFingerprint = entries.clone().into_iter().collect();
            let mut changed = entries;
            let key = pick.get(&changed.keys().cloned().collect::<Vec<_>>()).clone();
            changed.insert(key, "changed".to_string());

            prop_assert!(stored.differs_from(&ConfigFingerprint::from(changed)));
        }
    }
}
