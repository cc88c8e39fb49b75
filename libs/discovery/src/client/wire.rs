//! JSON shapes returned by the manager
//!
//! Every list arrives in an `items` envelope. Items are decoded one at a
//! time so a single malformed entry is skipped instead of failing the page.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::{RoleConfig, RoleSummary, ServiceSummary};
use crate::model::ServiceConfiguration;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub items: Option<Vec<Value>>,
}

impl Envelope {
    /// `None` when the manager sent no item list
    pub fn decode<T: DeserializeOwned>(self, url: &str) -> Option<Vec<T>> {
        let items = self.items?;
        Some(
            items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<T>(item) {
                    Ok(decoded) => Some(decoded),
                    Err(e) => {
                        warn!("Skipping malformed entry from {}: {}", url, e);
                        None
                    }
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCluster {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiService {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
}

impl From<ApiService> for ServiceSummary {
    fn from(service: ApiService) -> Self {
        Self {
            name: service.name,
            service_type: service.service_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiConfigVersion {
    #[serde(rename = "type")]
    pub config_type: String,
    pub version: Value,
    #[serde(default)]
    pub is_current: Option<bool>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl ApiConfigVersion {
    /// Entries explicitly flagged as not current are dropped
    pub fn into_current(self) -> Option<ServiceConfiguration> {
        if self.is_current == Some(false) {
            return None;
        }
        let properties = self
            .properties
            .into_iter()
            .filter_map(|(key, value)| scalar_text(value).map(|text| (key, text)))
            .collect();
        let version = scalar_text(self.version).unwrap_or_default();
        Some(ServiceConfiguration::new(self.config_type, version, properties))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiHostRef {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub public_hostname: Option<String>,
}

impl ApiHostRef {
    /// Some manager versions omit the public hostname
    pub fn host_name(self) -> Option<String> {
        self.public_hostname
            .filter(|h| !h.is_empty())
            .or(self.hostname.filter(|h| !h.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiRole {
    pub name: String,
    #[serde(rename = "type")]
    pub role_type: String,
    #[serde(default)]
    pub host_ref: Option<ApiHostRef>,
}

impl From<ApiRole> for RoleSummary {
    fn from(role: ApiRole) -> Self {
        Self {
            name: role.name,
            role_type: role.role_type,
            host_name: role.host_ref.and_then(ApiHostRef::host_name),
        }
    }
}

/// One configuration entry; `value` is absent when the default applies
#[derive(Debug, Deserialize)]
pub(crate) struct ApiConfig {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiConfigList {
    #[serde(default)]
    pub items: Option<Vec<ApiConfig>>,
}

impl ApiConfigList {
    /// `None` when the list carries no items
    pub fn into_properties(self) -> Option<HashMap<String, String>> {
        let items = self.items?;
        Some(
            items
                .into_iter()
                .filter_map(|config| {
                    let value = config.value.or(config.default).and_then(scalar_text)?;
                    Some((config.name, value))
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiRoleConfig {
    pub name: String,
    pub role_type: String,
    #[serde(default)]
    pub host_ref: Option<ApiHostRef>,
    #[serde(default)]
    pub config: Option<ApiConfigList>,
}

impl ApiRoleConfig {
    /// Roles without a configuration list are dropped
    pub fn into_role_config(self) -> Option<RoleConfig> {
        let properties = self.config.and_then(ApiConfigList::into_properties)?;
        Some(RoleConfig {
            role: RoleSummary {
                name: self.name,
                role_type: self.role_type,
                host_name: self.host_ref.and_then(ApiHostRef::host_name),
            },
            properties,
        })
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
