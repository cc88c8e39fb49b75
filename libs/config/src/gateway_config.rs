//! Gateway Configuration Module
//!
//! Provides configuration loading for the discovery components.
//! Supports loading from TOML files with environment-specific overrides
//! and `GATEWAY__SECTION__KEY` environment variables.

use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::defaults;

/// Main gateway configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GatewayConfig {
    /// Process-wide locations
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Discovery client, cache and mapping settings
    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Background change monitor settings
    #[serde(default)]
    pub monitor: MonitorSettings,
}

/// Gateway locations
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatewaySettings {
    #[serde(default = "default_conf_dir")]
    pub conf_dir: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// How roles and their configuration are pulled from the manager
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoleFetchStrategy {
    /// List roles, then fetch each role's configuration
    ByRole,
    /// Fetch role configuration in pages at the service level
    #[default]
    ByService,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiscoverySettings {
    /// Manager address used when a descriptor names none
    pub default_address: Option<String>,

    /// Cluster name used when a descriptor names none
    pub default_cluster: Option<String>,

    #[serde(default = "default_user_alias")]
    pub default_user_alias: String,

    #[serde(default = "default_password_alias")]
    pub default_password_alias: String,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub role_fetch_strategy: RoleFetchStrategy,

    #[serde(default = "default_excluded_role_types")]
    pub excluded_role_types: Vec<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    // Mapping override documents, consulted when the conf dir has none
    pub url_mapping_override: Option<PathBuf>,
    pub component_mapping_override: Option<PathBuf>,
    pub ha_mapping_override: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_conf_dir() -> PathBuf {
    PathBuf::from(defaults::gateway::CONF_DIR)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(defaults::gateway::DATA_DIR)
}

fn default_user_alias() -> String {
    defaults::discovery::DEFAULT_USER_ALIAS.to_string()
}

fn default_password_alias() -> String {
    defaults::discovery::DEFAULT_PASSWORD_ALIAS.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    defaults::discovery::CACHE_TTL_SECS
}

fn default_max_retry_attempts() -> u32 {
    defaults::discovery::MAX_RETRY_ATTEMPTS
}

fn default_page_size() -> u32 {
    defaults::discovery::PAGE_SIZE
}

fn default_excluded_role_types() -> Vec<String> {
    defaults::discovery::EXCLUDED_ROLE_TYPES
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_connect_timeout_ms() -> u64 {
    defaults::discovery::CONNECT_TIMEOUT_MS
}

fn default_read_timeout_ms() -> u64 {
    defaults::discovery::READ_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    defaults::monitor::INTERVAL_SECS
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            conf_dir: default_conf_dir(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            default_address: None,
            default_cluster: None,
            default_user_alias: default_user_alias(),
            default_password_alias: default_password_alias(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_retry_attempts: default_max_retry_attempts(),
            page_size: default_page_size(),
            role_fetch_strategy: RoleFetchStrategy::default(),
            excluded_role_types: default_excluded_role_types(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            url_mapping_override: None,
            component_mapping_override: None,
            ha_mapping_override: None,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
        }
    }
}

impl DiscoverySettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl MonitorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl GatewayConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(base) = base_path {
            builder = builder.add_source(File::from(base).required(true));
        }

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base_path
                .and_then(Path::parent)
                .unwrap_or(Path::new("config"))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (GATEWAY__DISCOVERY__PAGE_SIZE=100)
        builder = builder.add_source(
            Environment::with_prefix(defaults::gateway::ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("discovery.excluded_role_types")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut config: GatewayConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.expand_env_vars()?;

        debug!("Loaded gateway configuration: {:?}", config);
        Ok(config)
    }

    /// Expand `$VAR` and `~` in path values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        self.gateway.conf_dir = expand_path(&self.gateway.conf_dir)
            .context("Failed to expand conf dir")?;
        self.gateway.data_dir = expand_path(&self.gateway.data_dir)
            .context("Failed to expand data dir")?;

        let discovery = &mut self.discovery;
        for path in [
            &mut discovery.url_mapping_override,
            &mut discovery.component_mapping_override,
            &mut discovery.ha_mapping_override,
        ] {
            if let Some(p) = path.as_mut() {
                *p = expand_path(p).context("Failed to expand mapping override path")?;
            }
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Convenience function to load configuration with defaults
pub fn load_config(path: Option<&Path>, environment: Option<&str>) -> Result<GatewayConfig> {
    GatewayConfig::load(path, environment)
}
