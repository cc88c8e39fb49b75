//! Discovery Client
//!
//! [`ServiceDiscovery`] turns one discovery request into a [`Cluster`]:
//!
//! 1. resolve the manager address and cluster name, falling back to the
//!    gateway-wide defaults;
//! 2. serve a live cache entry when there is one;
//! 3. resolve credentials through the alias service;
//! 4. fetch services, their current configurations and their roles;
//! 5. assemble the model, cache it and register it with the monitor.
//!
//! A request without an address or cluster name is a configuration problem
//! and yields `Ok(None)`. Transport failures that survive the retry policy
//! surface as errors so the caller can keep serving its previous model.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use gateway_config::{DiscoverySettings, GatewayConfig};

use crate::cache::DiscoveryCache;
use crate::client::roles::collector_for;
use crate::client::{
    AliasService, Credentials, ManagerApi, ManagerEndpoint, RetryingManagerApi, RoleCollector,
    RoleConfig, ServiceSummary,
};
use crate::error::{DiscoveryError, Result};
use crate::identity::{ClusterKey, DiscoveryConfig};
use crate::mappings::Mappings;
use crate::model::{Cluster, ClusterBuilder, Component};
use crate::monitor::{ConfigFingerprint, ConfigVersionSource, ConfigurationMonitor};

pub struct ServiceDiscovery {
    settings: DiscoverySettings,
    api: RetryingManagerApi,
    collector: Box<dyn RoleCollector>,
    aliases: Arc<dyn AliasService>,
    mappings: Mappings,
    cache: Arc<DiscoveryCache>,
    monitor: Option<Arc<ConfigurationMonitor>>,
}

impl ServiceDiscovery {
    pub fn new(
        settings: &DiscoverySettings,
        api: Arc<dyn ManagerApi>,
        aliases: Arc<dyn AliasService>,
        mappings: Mappings,
        cache: Arc<DiscoveryCache>,
    ) -> Self {
        Self {
            settings: settings.clone(),
            api: RetryingManagerApi::new(api, settings.max_retry_attempts),
            collector: collector_for(settings),
            aliases,
            mappings,
            cache,
            monitor: None,
        }
    }

    /// Successful discoveries are registered with `monitor`
    pub fn with_monitor(mut self, monitor: Arc<ConfigurationMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    pub fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    /// Discover one cluster; `cluster_name` overrides the configured name
    pub async fn discover(
        &self,
        gateway: &GatewayConfig,
        config: &DiscoveryConfig,
        cluster_name: Option<&str>,
    ) -> Result<Option<Arc<Cluster>>> {
        let Some(effective) = effective_config(gateway, config, cluster_name) else {
            warn!(
                "Cannot discover cluster: manager address or cluster name unresolved ({:?}, {:?})",
                config.address, cluster_name.or(config.cluster.as_deref())
            );
            return Ok(None);
        };
        let Some(key) = effective.key() else {
            return Ok(None);
        };

        if let Some(cluster) = self.cache.get(&key) {
            debug!("Using cached discovery of {}", key);
            return Ok(Some(cluster));
        }

        let endpoint = self.endpoint(&key.address, &effective)?;
        info!("Discovering cluster {}", key);
        let cluster = Arc::new(self.fetch_cluster(&endpoint, &key.cluster).await.map_err(|e| {
            error!("Discovery of {} failed: {}", key, e);
            e
        })?);

        if cluster.is_empty() {
            warn!("Manager reported nothing usable for {}", key);
        }
        if let Some(monitor) = &self.monitor {
            monitor.register(&effective, &cluster);
        }
        self.cache.put(key, Arc::clone(&cluster));

        Ok(Some(cluster))
    }

    /// Discover every cluster the manager knows about
    pub async fn discover_all(
        &self,
        gateway: &GatewayConfig,
        config: &DiscoveryConfig,
    ) -> Result<Vec<Arc<Cluster>>> {
        let Some(address) = config
            .address
            .clone()
            .or_else(|| gateway.discovery.default_address.clone())
        else {
            warn!("Cannot discover clusters: manager address unresolved");
            return Ok(Vec::new());
        };

        let lookup = DiscoveryConfig {
            address: Some(address.clone()),
            ..config.clone()
        };
        let endpoint = self.endpoint(&address, &lookup)?;
        let names = self.api.list_clusters(&endpoint).await?;

        let mut clusters = Vec::with_capacity(names.len());
        for name in names {
            match self.discover(gateway, &lookup, Some(&name)).await {
                Ok(Some(cluster)) => clusters.push(cluster),
                Ok(None) => {}
                Err(e) => warn!("Skipping cluster {} at {}: {}", name, address, e),
            }
        }
        Ok(clusters)
    }

    /// Discovery narrowed to named services is not available
    pub async fn discover_services(
        &self,
        _gateway: &GatewayConfig,
        _config: &DiscoveryConfig,
        _cluster_name: Option<&str>,
        service_names: &[&str],
    ) -> Result<Option<Arc<Cluster>>> {
        Err(DiscoveryError::unsupported(format!(
            "discovery filtered to services [{}]",
            service_names.join(", ")
        )))
    }

    fn endpoint(&self, address: &str, config: &DiscoveryConfig) -> Result<ManagerEndpoint> {
        let credentials = Credentials::resolve(address, config, &self.settings, self.aliases.as_ref())
            .map_err(|e| {
                error!("{}", e);
                e
            })?;
        Ok(ManagerEndpoint::new(address, credentials))
    }

    async fn fetch_cluster(&self, endpoint: &ManagerEndpoint, cluster_name: &str) -> Result<Cluster> {
        let services = self.api.list_services(endpoint, cluster_name).await?;
        debug!("Cluster {} has {} services", cluster_name, services.len());

        let mut builder = Cluster::builder(cluster_name);
        let mut service_roles: Vec<(ServiceSummary, Vec<RoleConfig>)> = Vec::with_capacity(services.len());

        for service in services {
            let configs = self
                .api
                .current_config_versions(endpoint, cluster_name, &service.name)
                .await?;
            for config in configs {
                builder.add_service_configuration(service.service_type.as_str(), config);
            }

            let roles = self
                .collector
                .collect(&self.api, endpoint, cluster_name, &service.name)
                .await?;
            service_roles.push((service, roles));
        }

        // Components draw on configurations of any service, so all of them
        // must be in place first
        for (service, roles) in service_roles {
            for role in roles {
                let component = self.assemble_component(&builder, &service, role);
                builder.add_component(component);
            }
        }

        Ok(builder.build(self.mappings.url_factory(), self.mappings.ha()))
    }

    /// Mapped service configuration overlaid with the role's own configuration
    fn assemble_component(&self, builder: &ClusterBuilder, service: &ServiceSummary, role: RoleConfig) -> Component {
        let mapped = self
            .mappings
            .components()
            .config_type(&role.role.role_type)
            .and_then(|config_type| {
                builder
                    .lookup_service_configuration(&service.service_type, config_type)
                    .or_else(|| builder.lookup_configuration_by_type(config_type))
            });

        let mut properties: HashMap<String, String> = mapped
            .map(|config| config.properties().clone())
            .unwrap_or_default();
        properties.extend(role.properties);

        let version = mapped.map(|config| config.version()).unwrap_or_default();
        let component = Component::new(
            role.role.role_type.as_str(),
            service.service_type.as_str(),
            builder.name(),
            version,
        )
        .with_properties(properties);

        match role.role.host_name {
            Some(host) => component.with_hosts([host]),
            None => {
                warn!("Role {} has no host assignment", role.role.name);
                component
            }
        }
    }

    async fn fetch_versions(&self, endpoint: &ManagerEndpoint, cluster_name: &str) -> Result<ConfigFingerprint> {
        let mut fingerprint = ConfigFingerprint::new();
        for service in self.api.list_services(endpoint, cluster_name).await? {
            for config in self
                .api
                .current_config_versions(endpoint, cluster_name, &service.name)
                .await?
            {
                fingerprint.insert(config.config_type(), config.version());
            }
        }
        Ok(fingerprint)
    }
}

#[async_trait]
impl ConfigVersionSource for ServiceDiscovery {
    async fn current_versions(&self, config: &DiscoveryConfig) -> Result<ConfigFingerprint> {
        let key = config
            .key()
            .ok_or_else(|| DiscoveryError::config("monitored cluster lacks address or name"))?;
        let endpoint = self.endpoint(&key.address, config)?;
        self.fetch_versions(&endpoint, &key.cluster).await
    }
}

/// Explicit values first, then the gateway defaults
fn effective_config(
    gateway: &GatewayConfig,
    config: &DiscoveryConfig,
    cluster_name: Option<&str>,
) -> Option<DiscoveryConfig> {
    let address = config
        .address
        .clone()
        .or_else(|| gateway.discovery.default_address.clone())?;
    let cluster = cluster_name
        .map(str::to_string)
        .or_else(|| config.cluster.clone())
        .or_else(|| gateway.discovery.default_cluster.clone())?;

    Some(DiscoveryConfig {
        address: Some(address),
        cluster: Some(cluster),
        user: config.user.clone(),
        password_alias: config.password_alias.clone(),
    })
}

impl ClusterKey {
    /// Identity a request resolves to after applying the gateway defaults
    pub fn resolve(gateway: &GatewayConfig, config: &DiscoveryConfig, cluster_name: Option<&str>) -> Option<Self> {
        effective_config(gateway, config, cluster_name).and_then(|c| c.key())
    }
}
