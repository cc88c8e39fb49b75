//! # Gateway Configuration
//!
//! This crate provides the gateway-wide configuration consumed by the
//! topology discovery components, together with the constant defaults
//! every setting falls back to.
//!
//! ## Features
//!
//! - **Defaults**: timeouts, page sizes, aliases and well-known file names
//! - **Gateway Configuration**: TOML file plus `GATEWAY__*` environment overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gateway_config::{defaults, load_config};
//!
//! let config = load_config(None, None).unwrap();
//! assert_eq!(defaults::monitor::INTERVAL_SECS, 60);
//! println!("polling every {:?}", config.monitor.interval());
//! ```

pub mod defaults;
pub mod gateway_config;

// Re-export commonly used types
pub use gateway_config::{
    load_config, DiscoverySettings, GatewayConfig, GatewaySettings, MonitorSettings,
    RoleFetchStrategy,
};
