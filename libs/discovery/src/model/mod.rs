//! Cluster Model
//!
//! In-memory view of one cluster as reported by its manager: service
//! configurations grouped by configuration type, and components (roles)
//! with their host assignments. A [`Cluster`] is assembled once per
//! discovery run through [`ClusterBuilder`] and never mutated afterwards;
//! re-discovery produces a new value.

mod ha;

pub use ha::HaConfig;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::mappings::HaConfigMapping;
use crate::monitor::ConfigFingerprint;
use crate::urls::ServiceUrlFactory;

/// One configuration bundle of a service, e.g. `hdfs-site`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfiguration {
    config_type: String,
    version: String,
    properties: HashMap<String, String>,
}

impl ServiceConfiguration {
    pub fn new(
        config_type: impl Into<String>,
        version: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Self {
        Self {
            config_type: config_type.into(),
            version: version.into(),
            properties,
        }
    }

    pub fn config_type(&self) -> &str {
        &self.config_type
    }

    /// Opaque version marker, only ever compared for equality
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// A role of a service bound to one or more hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    name: String,
    service_name: String,
    cluster_name: String,
    version: String,
    host_names: Vec<String>,
    properties: HashMap<String, String>,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        service_name: impl Into<String>,
        cluster_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_name: service_name.into(),
            cluster_name: cluster_name.into(),
            version: version.into(),
            host_names: Vec::new(),
            properties: HashMap::new(),
        }
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for host in hosts {
            self.add_host(host);
        }
        self
    }

    pub fn with_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Hosts keep discovery order; a repeated host is ignored
    pub fn add_host(&mut self, host: impl Into<String>) {
        let host = host.into();
        if !self.host_names.contains(&host) {
            self.host_names.push(host);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn host_names(&self) -> &[String] {
        &self.host_names
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Discovered cluster snapshot
pub struct Cluster {
    name: String,
    services: HashMap<String, HashMap<String, ServiceConfiguration>>,
    components: HashMap<String, Component>,
    url_factory: Arc<ServiceUrlFactory>,
    ha_mapping: Arc<HaConfigMapping>,
}

impl Cluster {
    pub fn builder(name: impl Into<String>) -> ClusterBuilder {
        ClusterBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint URLs for a logical service; empty when nothing maps it
    pub fn service_urls(
        &self,
        service_name: &str,
        params: Option<&HashMap<String, String>>,
    ) -> Vec<String> {
        self.url_factory.create(self, service_name, params)
    }

    pub fn service_configuration(
        &self,
        service_name: &str,
        config_type: &str,
    ) -> Option<&ServiceConfiguration> {
        self.services
            .get(service_name)
            .and_then(|configs| configs.get(config_type))
    }

    pub fn service_configurations(&self) -> &HashMap<String, HashMap<String, ServiceConfiguration>> {
        &self.services
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn components(&self) -> &HashMap<String, Component> {
        &self.components
    }

    pub fn ha_config(&self, service_name: &str) -> Option<HaConfig> {
        self.ha_mapping.resolve(self, service_name)
    }

    /// Union of `configType -> version` over every service configuration
    pub fn config_versions(&self) -> ConfigFingerprint {
        self.services
            .values()
            .flat_map(|configs| configs.values())
            .map(|sc| (sc.config_type.clone(), sc.version.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.components.is_empty()
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("name", &self.name)
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Accumulates discovery results into a [`Cluster`]
#[derive(Debug)]
pub struct ClusterBuilder {
    name: String,
    services: HashMap<String, HashMap<String, ServiceConfiguration>>,
    components: HashMap<String, Component>,
}

impl ClusterBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: HashMap::new(),
            components: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Later configurations of the same `(service, type)` replace earlier ones
    pub fn service_configuration(
        mut self,
        service_name: impl Into<String>,
        config: ServiceConfiguration,
    ) -> Self {
        self.add_service_configuration(service_name, config);
        self
    }

    pub fn add_service_configuration(
        &mut self,
        service_name: impl Into<String>,
        config: ServiceConfiguration,
    ) {
        self.services
            .entry(service_name.into())
            .or_default()
            .insert(config.config_type.clone(), config);
    }

    pub fn lookup_service_configuration(
        &self,
        service_name: &str,
        config_type: &str,
    ) -> Option<&ServiceConfiguration> {
        self.services
            .get(service_name)
            .and_then(|configs| configs.get(config_type))
    }

    /// Find the configuration of a given type regardless of owning service
    pub fn lookup_configuration_by_type(&self, config_type: &str) -> Option<&ServiceConfiguration> {
        self.services
            .values()
            .find_map(|configs| configs.get(config_type))
    }

    pub fn component(mut self, component: Component) -> Self {
        self.add_component(component);
        self
    }

    /// A component seen again only contributes its hosts
    pub fn add_component(&mut self, component: Component) {
        match self.components.get_mut(&component.name) {
            Some(existing) => {
                for host in component.host_names {
                    existing.add_host(host);
                }
            }
            None => {
                self.components.insert(component.name.clone(), component);
            }
        }
    }

    pub fn build(
        self,
        url_factory: Arc<ServiceUrlFactory>,
        ha_mapping: Arc<HaConfigMapping>,
    ) -> Cluster {
        Cluster {
            name: self.name,
            services: self.services,
            components: self.components,
            url_factory,
            ha_mapping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::Mappings;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_component_hosts_keep_order_without_duplicates() {
        let component = Component::new("NAMENODE", "HDFS", "c1", "1")
            .with_hosts(["nn2", "nn1", "nn2", "nn3", "nn1"]);

        assert_eq!(component.host_names(), &["nn2", "nn1", "nn3"]);
    }

    #[test]
    fn test_builder_merges_repeated_components() {
        let mappings = Mappings::builtin().unwrap();
        let cluster = Cluster::builder("c1")
            .component(Component::new("DATANODE", "HDFS", "c1", "1").with_hosts(["dn1"]))
            .component(Component::new("DATANODE", "HDFS", "c1", "1").with_hosts(["dn2", "dn1"]))
            .build(mappings.url_factory(), mappings.ha());

        let dn = cluster.component("DATANODE").unwrap();
        assert_eq!(dn.host_names(), &["dn1", "dn2"]);
        assert!(cluster.component("NAMENODE").is_none());
    }

    #[test]
    fn test_config_versions_union() {
        let mappings = Mappings::builtin().unwrap();
        let cluster = Cluster::builder("c1")
            .service_configuration("HDFS", ServiceConfiguration::new("hdfs-site", "3", props(&[])))
            .service_configuration("HDFS", ServiceConfiguration::new("core-site", "2", props(&[])))
            .service_configuration("YARN", ServiceConfiguration::new("yarn-site", "7", props(&[])))
            .build(mappings.url_factory(), mappings.ha());

        let versions = cluster.config_versions();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions.get("hdfs-site"), Some("3"));
        assert_eq!(versions.get("yarn-site"), Some("7"));
        assert_eq!(
            cluster
                .service_configuration("HDFS", "core-site")
                .map(ServiceConfiguration::version),
            Some("2")
        );
        assert!(cluster.service_configuration("HDFS", "yarn-site").is_none());
    }
}
