//! HA coordination-service property mapping
//!
//! ```yaml
//! HIVE:
//!   config: "HIVE:hive-site"
//!   enabled: hive.server2.support.dynamic.service.discovery
//!   ensemble: hive.zookeeper.quorum
//!   namespace: hive.server2.zookeeper.namespace
//! ```
//!
//! `ensemble` may list several property names separated by commas; the
//! first one holding a value is used. `port` names a property whose value
//! replaces the port of every ensemble member.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{DiscoveryError, Result};
use crate::model::{Cluster, HaConfig};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HaPropertyMapping {
    /// `SERVICE:configType` holding the properties below
    pub config: String,
    pub enabled: Option<String>,
    pub ensemble: Option<String>,
    pub port: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HaConfigMapping {
    services: BTreeMap<String, HaPropertyMapping>,
}

impl HaConfigMapping {
    pub fn from_yaml(source_name: &str, yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let services = serde_yaml::from_str(yaml).map_err(|e| DiscoveryError::Mapping {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { services })
    }

    pub fn merge(&mut self, overrides: HaConfigMapping) {
        self.services.extend(overrides.services);
    }

    pub fn mapping(&self, service: &str) -> Option<&HaPropertyMapping> {
        self.services.get(service)
    }

    /// `None` when the service is unmapped or its configuration is absent
    pub fn resolve(&self, cluster: &Cluster, service: &str) -> Option<HaConfig> {
        let mapping = self.services.get(service)?;

        let Some((config_service, config_type)) = mapping.config.split_once(':') else {
            debug!("Malformed HA config reference for {}: {}", service, mapping.config);
            return None;
        };

        let sc = cluster.service_configuration(config_service, config_type)?;
        let value = |prop: &Option<String>| prop.as_deref().and_then(|p| sc.property(p));

        let ensemble = mapping.ensemble.as_deref().and_then(|candidates| {
            candidates
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .find_map(|p| sc.property(p))
        });

        Some(HaConfig::from_values(
            value(&mapping.enabled),
            ensemble,
            value(&mapping.port),
            value(&mapping.namespace),
        ))
    }
}
