use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::mappings::{PropertyDef, ServiceUrlMapping, UrlMappings};
use crate::model::Cluster;

// Derived properties may chain through each other; a cycle ends here
const MAX_DERIVATION_DEPTH: usize = 16;

/// Resolves services through their declarative URL pattern
#[derive(Debug, Clone)]
pub struct DynamicUrlCreator {
    mappings: Arc<UrlMappings>,
}

impl DynamicUrlCreator {
    pub fn new(mappings: Arc<UrlMappings>) -> Self {
        Self { mappings }
    }

    pub fn create(&self, cluster: &Cluster, service: &str) -> Vec<String> {
        let Some(mapping) = self.mappings.service(service) else {
            debug!("No URL mapping for service {}", service);
            return Vec::new();
        };
        let Some(pattern) = mapping.pattern() else {
            debug!("URL mapping for {} declares no pattern", service);
            return Vec::new();
        };

        let resolver = PropertyResolver { cluster, mapping };
        let mut values = HashMap::new();
        let mut hosts: Option<(&str, &[String])> = None;

        for placeholder in pattern.placeholders() {
            match mapping.property(placeholder) {
                Some(PropertyDef::ComponentHosts { component }) => {
                    if let Some(c) = cluster.component(component) {
                        debug!("Looking up hosts of component {}", component);
                        hosts = Some((placeholder.as_str(), c.host_names()));
                    }
                }
                Some(_) => {
                    let value = resolver.value(placeholder, 0);
                    debug!("Placeholder {} of {} resolved to {:?}", placeholder, service, value);
                    if let Some(value) = value {
                        values.insert(placeholder.clone(), value);
                    }
                }
                None => debug!("Placeholder {} of {} is not declared", placeholder, service),
            }
        }

        match hosts {
            Some((placeholder, host_names)) if !host_names.is_empty() => host_names
                .iter()
                .map(|host| {
                    let mut per_host = values.clone();
                    per_host.insert(placeholder.to_string(), host.clone());
                    pattern.render(&per_host)
                })
                .collect(),
            _ => vec![pattern.render(&values)],
        }
    }
}

struct PropertyResolver<'a> {
    cluster: &'a Cluster,
    mapping: &'a ServiceUrlMapping,
}

impl PropertyResolver<'_> {
    fn value(&self, name: &str, depth: usize) -> Option<String> {
        if depth > MAX_DERIVATION_DEPTH {
            debug!("Derivation of {} exceeded depth {}", name, MAX_DERIVATION_DEPTH);
            return None;
        }

        match self.mapping.property(name)? {
            PropertyDef::ServiceConfig {
                service,
                config_type,
                key,
            } => self
                .cluster
                .service_configuration(service, config_type)
                .and_then(|sc| sc.property(key))
                .map(str::to_string),
            PropertyDef::Component { component, key } => self
                .cluster
                .component(component)
                .and_then(|c| c.property(key))
                .map(str::to_string),
            PropertyDef::ComponentHosts { .. } => None,
            PropertyDef::Derived(expr) => {
                let lookup = |property: &str| self.value(property, depth + 1);
                expr.evaluate(&lookup)
            }
        }
    }
}
