//! Default values and well-known names
//!
//! This module contains default configuration values and constants
//! used across the discovery components for consistency.

/// Gateway process defaults
pub mod gateway {
    /// Directory holding gateway configuration and mapping overrides
    pub const CONF_DIR: &str = "./conf";

    /// Directory holding generated runtime state
    pub const DATA_DIR: &str = "./data";

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "GATEWAY";
}

/// Discovery client defaults
pub mod discovery {
    /// Alias resolving the manager user when none is configured
    pub const DEFAULT_USER_ALIAS: &str = "cluster.discovery.user";

    /// Alias resolving the manager password when none is configured
    pub const DEFAULT_PASSWORD_ALIAS: &str = "cluster.discovery.password";

    /// Discovery result time-to-live (seconds)
    pub const CACHE_TTL_SECS: u64 = 600;

    /// Attempts per remote call before a transient failure propagates
    pub const MAX_RETRY_ATTEMPTS: u32 = 3;

    /// Items requested per role page
    pub const PAGE_SIZE: u32 = 500;

    /// Connection timeout (milliseconds)
    pub const CONNECT_TIMEOUT_MS: u64 = 20_000;

    /// Read timeout (milliseconds)
    pub const READ_TIMEOUT_MS: u64 = 20_000;

    /// Role types never turned into components
    pub const EXCLUDED_ROLE_TYPES: &[&str] = &["GATEWAY", "BALANCER"];
}

/// Mapping override file names looked up in the conf dir
pub mod mappings {
    pub const URL_MAPPINGS_FILE: &str = "service-discovery-url-mappings.yaml";
    pub const COMPONENT_CONFIG_FILE: &str = "service-discovery-component-config.yaml";
    pub const HA_CONFIG_FILE: &str = "service-discovery-ha-config.yaml";
}

/// Configuration monitor defaults
pub mod monitor {
    /// Polling interval (seconds)
    pub const INTERVAL_SECS: u64 = 60;

    /// Subdirectory of the data dir holding persisted cluster records
    pub const CLUSTERS_DIR: &str = "clusters";
}
