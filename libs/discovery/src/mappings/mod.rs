//! Mapping documents
//!
//! Three YAML documents drive discovery: service URL mappings, the
//! component to configuration type mapping, and the HA property mapping.
//! Each has a built-in default compiled into the library. An operator
//! override is taken from the well-known file name in the gateway conf dir
//! or, failing that, from the explicit path in the gateway configuration.
//! Overrides are merged over the defaults; an unreadable override is logged
//! and the defaults stand.
//!
//! The loaded [`Mappings`] is immutable. Reloading means constructing a new
//! value and handing it to a new discovery client.

mod component;
mod ha;
mod url;

pub use component::ComponentConfigMapping;
pub use ha::{HaConfigMapping, HaPropertyMapping};
pub use url::{PropertyDef, ServiceUrlMapping, UrlMappings};

use gateway_config::{defaults, GatewayConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::Result;
use crate::urls::ServiceUrlFactory;

const BUILTIN_URL_MAPPINGS: &str = include_str!("../../resources/url-mappings.yaml");
const BUILTIN_COMPONENT_MAPPING: &str = include_str!("../../resources/component-config-mapping.yaml");
const BUILTIN_HA_MAPPING: &str = include_str!("../../resources/ha-config-mapping.yaml");

/// Everything the discovery client needs to interpret a manager's answer
#[derive(Debug, Clone)]
pub struct Mappings {
    components: Arc<ComponentConfigMapping>,
    ha: Arc<HaConfigMapping>,
    url_factory: Arc<ServiceUrlFactory>,
}

impl Mappings {
    /// Built-in documents only
    pub fn builtin() -> Result<Self> {
        Self::from_documents(None, None, None)
    }

    /// Built-in documents merged with the overrides the configuration points at
    pub fn load(config: &GatewayConfig) -> Result<Self> {
        let conf_dir = config.gateway.conf_dir.as_path();
        let discovery = &config.discovery;

        let url_override = read_override(locate_override(
            conf_dir,
            defaults::mappings::URL_MAPPINGS_FILE,
            discovery.url_mapping_override.as_deref(),
        ));
        let component_override = read_override(locate_override(
            conf_dir,
            defaults::mappings::COMPONENT_CONFIG_FILE,
            discovery.component_mapping_override.as_deref(),
        ));
        let ha_override = read_override(locate_override(
            conf_dir,
            defaults::mappings::HA_CONFIG_FILE,
            discovery.ha_mapping_override.as_deref(),
        ));

        Self::from_documents(
            url_override.as_ref().map(|(p, s)| (p.as_str(), s.as_str())),
            component_override.as_ref().map(|(p, s)| (p.as_str(), s.as_str())),
            ha_override.as_ref().map(|(p, s)| (p.as_str(), s.as_str())),
        )
    }

    /// Each override is `(source name, YAML text)`
    pub fn from_documents(
        url_override: Option<(&str, &str)>,
        component_override: Option<(&str, &str)>,
        ha_override: Option<(&str, &str)>,
    ) -> Result<Self> {
        let urls = match UrlMappings::merged(BUILTIN_URL_MAPPINGS, url_override) {
            Ok(urls) => urls,
            Err(e) if url_override.is_some() => {
                error!("Ignoring URL mapping override: {}", e);
                UrlMappings::merged(BUILTIN_URL_MAPPINGS, None)?
            }
            Err(e) => return Err(e),
        };

        let mut components =
            ComponentConfigMapping::from_yaml("built-in component mapping", BUILTIN_COMPONENT_MAPPING)?;
        if let Some((source, yaml)) = component_override {
            match ComponentConfigMapping::from_yaml(source, yaml) {
                Ok(overrides) => components.merge(overrides),
                Err(e) => error!("Ignoring component mapping override: {}", e),
            }
        }

        let mut ha = HaConfigMapping::from_yaml("built-in HA mapping", BUILTIN_HA_MAPPING)?;
        if let Some((source, yaml)) = ha_override {
            match HaConfigMapping::from_yaml(source, yaml) {
                Ok(overrides) => ha.merge(overrides),
                Err(e) => error!("Ignoring HA mapping override: {}", e),
            }
        }

        Ok(Self {
            components: Arc::new(components),
            ha: Arc::new(ha),
            url_factory: Arc::new(ServiceUrlFactory::with_default_creators(Arc::new(urls))),
        })
    }

    pub fn components(&self) -> &ComponentConfigMapping {
        &self.components
    }

    pub fn ha(&self) -> Arc<HaConfigMapping> {
        Arc::clone(&self.ha)
    }

    pub fn url_factory(&self) -> Arc<ServiceUrlFactory> {
        Arc::clone(&self.url_factory)
    }
}

/// The conf dir file wins over the explicitly configured path
pub fn locate_override(conf_dir: &Path, file_name: &str, explicit: Option<&Path>) -> Option<PathBuf> {
    let candidate = conf_dir.join(file_name);
    if candidate.exists() {
        return Some(candidate);
    }
    explicit.map(Path::to_path_buf)
}

fn read_override(path: Option<PathBuf>) -> Option<(String, String)> {
    let path = path?;
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            info!("Loaded mapping override {:?}", path);
            Some((path.display().to_string(), content))
        }
        Err(e) => {
            error!("Failed to read mapping override {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_documents_parse() {
        let mappings = Mappings::builtin().unwrap();

        assert_eq!(mappings.components().config_type("NAMENODE"), Some("hdfs-site"));
        assert!(mappings.ha().mapping("HIVE").is_some());
    }

    #[test]
    fn test_conf_dir_override_wins_over_explicit_path() {
        let dir = tempdir().unwrap();
        let conf_file = dir.path().join(defaults::mappings::COMPONENT_CONFIG_FILE);
        let explicit = dir.path().join("elsewhere.yaml");
        fs::write(&conf_file, "NAMENODE: custom-site\n").unwrap();
        fs::write(&explicit, "NAMENODE: other-site\n").unwrap();

        let located = locate_override(dir.path(), defaults::mappings::COMPONENT_CONFIG_FILE, Some(explicit.as_path()));
        assert_eq!(located, Some(conf_file));

        fs::remove_file(dir.path().join(defaults::mappings::COMPONENT_CONFIG_FILE)).unwrap();
        let located = locate_override(dir.path(), defaults::mappings::COMPONENT_CONFIG_FILE, Some(explicit.as_path()));
        assert_eq!(located, Some(explicit));
    }

    #[test]
    fn test_load_applies_overrides_from_config() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(defaults::mappings::COMPONENT_CONFIG_FILE),
            "NAMENODE: custom-site\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(defaults::mappings::URL_MAPPINGS_FILE),
            "not: [valid",
        )
        .unwrap();

        let mut config = GatewayConfig::default();
        config.gateway.conf_dir = dir.path().to_path_buf();

        // The broken URL override is dropped, the component override applies
        let mappings = Mappings::load(&config).unwrap();
        assert_eq!(mappings.components().config_type("NAMENODE"), Some("custom-site"));
        assert_eq!(mappings.components().config_type("OOZIE_SERVER"), Some("oozie-site"));
    }
}
