//! Manager REST client over HTTP

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

use gateway_config::DiscoverySettings;

use super::wire::{ApiCluster, ApiConfigList, ApiConfigVersion, ApiRole, ApiRoleConfig, ApiService, Envelope};
use super::{ManagerApi, ManagerEndpoint, RoleConfig, RoleSummary, ServiceSummary};
use crate::error::{DiscoveryError, Result};
use crate::model::ServiceConfiguration;

const API_ROOT: [&str; 2] = ["api", "v1"];
const VIEW_FULL: &str = "full";

#[derive(Debug, Clone)]
pub struct HttpManagerApi {
    client: Client,
}

impl HttpManagerApi {
    pub fn new(settings: &DiscoverySettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.read_timeout())
            .build()
            .map_err(|e| DiscoveryError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// `{address}/api/v1/clusters/<segments...>` with percent-encoded segments
    fn url(&self, address: &str, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(address)
            .map_err(|e| DiscoveryError::config(format!("Invalid manager address {}: {}", address, e)))?;
        url.path_segments_mut()
            .map_err(|_| DiscoveryError::config(format!("Manager address {} cannot hold a path", address)))?
            .pop_if_empty()
            .extend(API_ROOT)
            .push("clusters")
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &ManagerEndpoint, url: Url) -> Result<T> {
        let url_text = url.to_string();
        debug!("GET {}", url_text);

        let response = self
            .client
            .get(url)
            .basic_auth(&endpoint.credentials.user, Some(&endpoint.credentials.password))
            .send()
            .await
            .map_err(|e| DiscoveryError::from_reqwest(&url_text, e))?
            .error_for_status()
            .map_err(|e| DiscoveryError::from_reqwest(&url_text, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| DiscoveryError::from_reqwest(&url_text, e))?;
        serde_json::from_slice(&body).map_err(|e| DiscoveryError::MalformedResponse {
            url: url_text,
            message: e.to_string(),
        })
    }

    async fn get_items<T: DeserializeOwned>(
        &self,
        endpoint: &ManagerEndpoint,
        url: Url,
    ) -> Result<Option<Vec<T>>> {
        let url_text = url.to_string();
        let envelope: Envelope = self.get(endpoint, url).await?;
        Ok(envelope.decode(&url_text))
    }
}

fn paging(limit: u32, offset: u32) -> Vec<(&'static str, String)> {
    vec![("limit", limit.to_string()), ("offset", offset.to_string())]
}

#[async_trait]
impl ManagerApi for HttpManagerApi {
    async fn list_clusters(&self, endpoint: &ManagerEndpoint) -> Result<Vec<String>> {
        let url = self.url(&endpoint.address, &[], &[])?;
        let clusters: Vec<ApiCluster> = self.get_items(endpoint, url).await?.unwrap_or_default();
        Ok(clusters.into_iter().map(|c| c.name).collect())
    }

    async fn list_services(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
    ) -> Result<Vec<ServiceSummary>> {
        let url = self.url(&endpoint.address, &[cluster, "services"], &[])?;
        let services: Vec<ApiService> = self.get_items(endpoint, url).await?.unwrap_or_default();
        Ok(services.into_iter().map(ServiceSummary::from).collect())
    }

    async fn current_config_versions(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
    ) -> Result<Vec<ServiceConfiguration>> {
        let url = self.url(
            &endpoint.address,
            &[cluster, "services", service, "config_versions"],
            &[("is_current", "true".to_string())],
        )?;
        let versions: Vec<ApiConfigVersion> = self.get_items(endpoint, url).await?.unwrap_or_default();
        Ok(versions
            .into_iter()
            .filter_map(ApiConfigVersion::into_current)
            .collect())
    }

    async fn read_roles(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<Vec<RoleSummary>>> {
        let url = self.url(
            &endpoint.address,
            &[cluster, "services", service, "roles"],
            &paging(limit, offset),
        )?;
        let roles: Option<Vec<ApiRole>> = self.get_items(endpoint, url).await?;
        Ok(roles.map(|roles| roles.into_iter().map(RoleSummary::from).collect()))
    }

    async fn read_role_config(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        role: &str,
    ) -> Result<Option<HashMap<String, String>>> {
        let url = self.url(
            &endpoint.address,
            &[cluster, "services", service, "roles", role, "config"],
            &[("view", VIEW_FULL.to_string())],
        )?;
        let configs: ApiConfigList = self.get(endpoint, url).await?;
        Ok(configs.into_properties())
    }

    async fn read_roles_config(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<Vec<RoleConfig>>> {
        let mut query = paging(limit, offset);
        query.push(("view", VIEW_FULL.to_string()));
        let url = self.url(
            &endpoint.address,
            &[cluster, "services", service, "roles", "config"],
            &query,
        )?;
        let url_text = url.to_string();
        let configs: Option<Vec<ApiRoleConfig>> = self.get_items(endpoint, url).await?;

        Ok(configs.map(|configs| {
            configs
                .into_iter()
                .filter_map(|config| {
                    let name = config.name.clone();
                    let role_config = config.into_role_config();
                    if role_config.is_none() {
                        warn!("Role {} from {} has no configuration, skipping", name, url_text);
                    }
                    role_config
                })
                .collect()
        }))
    }
}
