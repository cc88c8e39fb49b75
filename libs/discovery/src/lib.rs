//! Topology Discovery
//!
//! This crate asks a cluster manager what a cluster looks like and derives
//! routable endpoint URLs from the answer, so gateway routing follows the
//! cluster when services move, enable TLS or change ports.
//!
//! ## Components
//!
//! - [`model`]: discovered services, configurations and components
//! - [`client`] and [`ServiceDiscovery`]: manager REST calls, role paging and retry
//! - [`urls`]: declarative URL patterns plus specialized per-service creators
//! - [`DiscoveryCache`]: TTL cache of discovery results
//! - [`monitor`]: persisted configuration fingerprints and drift polling
//!
//! Everything is constructed explicitly and passed in; there is no global
//! state. Reloading mappings means building a new [`Mappings`].

pub mod cache;
pub mod client;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod mappings;
pub mod model;
pub mod monitor;
pub mod urls;

// Re-export commonly used types
pub use cache::{CacheInvalidatingListener, DiscoveryCache};
pub use client::{AliasService, HttpManagerApi, ManagerApi};
pub use discovery::ServiceDiscovery;
pub use error::{DiscoveryError, Result};
pub use identity::{ClusterKey, DiscoveryConfig};
pub use mappings::Mappings;
pub use model::{Cluster, ClusterBuilder, Component, HaConfig, ServiceConfiguration};
pub use monitor::{
    ConfigFingerprint, ConfigVersionSource, ConfigurationChangeListener, ConfigurationMonitor,
};
pub use urls::{ServiceUrlCreator, ServiceUrlFactory};
