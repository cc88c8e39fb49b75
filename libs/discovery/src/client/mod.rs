//! Cluster manager client
//!
//! [`ManagerApi`] is the seam between discovery and the manager's REST
//! interface. [`HttpManagerApi`] talks to a real manager over HTTP;
//! [`RetryingManagerApi`] wraps any implementation with the bounded retry
//! policy. Role pagination lives in [`roles`].

mod credentials;
mod http;
mod retry;
pub mod roles;
mod wire;

pub use credentials::{AliasService, Credentials, EnvAliasService, MapAliasService};
pub use http::HttpManagerApi;
pub use retry::{with_retries, RetryingManagerApi};
pub use roles::{ByRoleCollector, ByServiceCollector, RoleCollector, TypeNameFilter};

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::model::ServiceConfiguration;

/// Where and as whom to call the manager
#[derive(Debug, Clone)]
pub struct ManagerEndpoint {
    pub address: String,
    pub credentials: Credentials,
}

impl ManagerEndpoint {
    pub fn new(address: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            address: address.into(),
            credentials,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSummary {
    /// Name used in manager API paths
    pub name: String,
    /// Service type, the key service configurations are filed under
    pub service_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSummary {
    pub name: String,
    pub role_type: String,
    /// Public hostname when the manager reports one, else the internal hostname
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleConfig {
    pub role: RoleSummary,
    pub properties: HashMap<String, String>,
}

/// Remote calls discovery needs from a cluster manager
///
/// Paged calls return `None` when the manager sent no item list at all;
/// callers treat that exactly like an empty page.
#[async_trait]
pub trait ManagerApi: Send + Sync {
    async fn list_clusters(&self, endpoint: &ManagerEndpoint) -> Result<Vec<String>>;

    async fn list_services(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
    ) -> Result<Vec<ServiceSummary>>;

    /// Only the currently active version of each configuration type
    async fn current_config_versions(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
    ) -> Result<Vec<ServiceConfiguration>>;

    async fn read_roles(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<Vec<RoleSummary>>>;

    async fn read_role_config(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        role: &str,
    ) -> Result<Option<HashMap<String, String>>>;

    async fn read_roles_config(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<Vec<RoleConfig>>>;
}
