//! Component to configuration type mapping
//!
//! Tells discovery which service configuration carries the properties of a
//! component, e.g. `NAMENODE: hdfs-site`.

use std::collections::BTreeMap;

use crate::error::{DiscoveryError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentConfigMapping {
    config_types: BTreeMap<String, String>,
}

impl ComponentConfigMapping {
    pub fn from_yaml(source_name: &str, yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config_types = serde_yaml::from_str(yaml).map_err(|e| DiscoveryError::Mapping {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { config_types })
    }

    /// Entries of `overrides` replace or extend ours
    pub fn merge(&mut self, overrides: ComponentConfigMapping) {
        self.config_types.extend(overrides.config_types);
    }

    pub fn config_type(&self, component: &str) -> Option<&str> {
        self.config_types.get(component).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.config_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config_types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_merges_per_component() {
        let mut mapping =
            ComponentConfigMapping::from_yaml("defaults", "NAMENODE: hdfs-site\nOOZIE_SERVER: oozie-site\n")
                .unwrap();
        let overrides =
            ComponentConfigMapping::from_yaml("override", "OOZIE_SERVER: oozie-custom\nKNOX_GATEWAY: gateway-site\n")
                .unwrap();

        mapping.merge(overrides);

        assert_eq!(mapping.config_type("NAMENODE"), Some("hdfs-site"));
        assert_eq!(mapping.config_type("OOZIE_SERVER"), Some("oozie-custom"));
        assert_eq!(mapping.config_type("KNOX_GATEWAY"), Some("gateway-site"));
        assert_eq!(mapping.len(), 3);
    }
}
