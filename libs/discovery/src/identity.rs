//! Discovery parameters and the identity they key state by

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters of one discovery request, as supplied by a topology descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Manager endpoint, e.g. `http://manager:7180`
    pub address: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
    /// Alias of the password in the external secret store, never the secret
    pub password_alias: Option<String>,
}

impl DiscoveryConfig {
    pub fn new(address: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            cluster: Some(cluster.into()),
            user: None,
            password_alias: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_password_alias(mut self, alias: impl Into<String>) -> Self {
        self.password_alias = Some(alias.into());
        self
    }

    /// Identity of a fully specified configuration
    pub fn key(&self) -> Option<ClusterKey> {
        match (&self.address, &self.cluster) {
            (Some(address), Some(cluster)) => Some(ClusterKey::new(address.as_str(), cluster.as_str())),
            _ => None,
        }
    }
}

/// `(manager address, cluster name)`: two managers may share a cluster name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterKey {
    pub address: String,
    pub cluster: String,
}

impl ClusterKey {
    pub fn new(address: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            cluster: cluster.into(),
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.cluster, self.address)
    }
}
