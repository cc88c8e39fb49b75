//! Service-URL Resolution Engine
//!
//! Turns a discovered [`Cluster`] and a logical service name into endpoint
//! URLs. Resolution tries, in order:
//!
//! 1. a specialized [`ServiceUrlCreator`] registered for the service name,
//!    used exclusively when present;
//! 2. the declarative URL pattern from the mapping document
//!    ([`DynamicUrlCreator`]).
//!
//! A service with neither resolves to an empty list. Placeholders that could
//! not be resolved stay in the URL as literal `{NAME}` text and are logged.

mod dynamic;
mod expr;
mod hdfs;
mod pattern;
mod spark;
mod yarn;

pub use dynamic::DynamicUrlCreator;
pub use expr::{PropertyLookup, ValueExpr};
pub use hdfs::{HdfsUiUrlCreator, WebHdfsUrlCreator, NAMESERVICE_PARAM};
pub use pattern::{has_unresolved, UrlPattern};
pub use spark::{LivyUrlCreator, SparkHistoryUiUrlCreator, SparkThriftServerUiUrlCreator};
pub use yarn::YarnUiUrlCreator;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::mappings::UrlMappings;
use crate::model::Cluster;

pub const SCHEME_HTTP: &str = "http";
pub const SCHEME_HTTPS: &str = "https";
pub const HTTPS_ONLY_POLICY: &str = "HTTPS_ONLY";

/// Strategy producing URLs for exactly one logical service
pub trait ServiceUrlCreator: Send + Sync {
    fn target_service(&self) -> &str;

    fn create(&self, cluster: &Cluster, params: Option<&HashMap<String, String>>) -> Vec<String>;
}

pub struct ServiceUrlFactory {
    creators: HashMap<String, Arc<dyn ServiceUrlCreator>>,
    dynamic: DynamicUrlCreator,
}

impl ServiceUrlFactory {
    /// Declarative patterns only
    pub fn new(mappings: Arc<UrlMappings>) -> Self {
        Self {
            creators: HashMap::new(),
            dynamic: DynamicUrlCreator::new(mappings),
        }
    }

    /// Declarative patterns plus the built-in specialized creators
    pub fn with_default_creators(mappings: Arc<UrlMappings>) -> Self {
        Self::new(mappings)
            .with_creator(Arc::new(WebHdfsUrlCreator))
            .with_creator(Arc::new(HdfsUiUrlCreator))
            .with_creator(Arc::new(YarnUiUrlCreator))
            .with_creator(Arc::new(SparkHistoryUiUrlCreator))
            .with_creator(Arc::new(SparkThriftServerUiUrlCreator))
            .with_creator(Arc::new(LivyUrlCreator))
    }

    /// A later creator for the same service replaces the earlier one
    pub fn with_creator(mut self, creator: Arc<dyn ServiceUrlCreator>) -> Self {
        self.creators
            .insert(creator.target_service().to_string(), creator);
        self
    }

    pub fn has_creator(&self, service: &str) -> bool {
        self.creators.contains_key(service)
    }

    pub fn create(
        &self,
        cluster: &Cluster,
        service: &str,
        params: Option<&HashMap<String, String>>,
    ) -> Vec<String> {
        let urls = match self.creators.get(service) {
            Some(creator) => {
                debug!("Using specialized URL creator for {}", service);
                creator.create(cluster, params)
            }
            None => self.dynamic.create(cluster, service),
        };

        for url in urls.iter().filter(|url| has_unresolved(url)) {
            warn!("Unresolved placeholders in {} URL for cluster {}: {}", service, cluster.name(), url);
        }

        urls
    }
}

impl fmt::Debug for ServiceUrlFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceUrlFactory")
            .field("creators", &self.creators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// `https` when the policy property equals `HTTPS_ONLY`
pub(crate) fn scheme_for_policy(policy: Option<&str>) -> &'static str {
    if policy == Some(HTTPS_ONLY_POLICY) {
        SCHEME_HTTPS
    } else {
        SCHEME_HTTP
    }
}

/// `https` when the flag property reads `true`
pub(crate) fn scheme_for_flag(flag: Option<&str>) -> &'static str {
    if is_true(flag) {
        SCHEME_HTTPS
    } else {
        SCHEME_HTTP
    }
}

pub(crate) fn is_true(value: Option<&str>) -> bool {
    value.map_or(false, |v| v.trim().eq_ignore_ascii_case("true"))
}

/// Addresses of the members of an HA group
///
/// With a member list (`nn1,nn2`) each `<prefix>.<member>` is looked up
/// directly; otherwise `<prefix>.<stem>1`, `<prefix>.<stem>2`, ... are read
/// until the first gap.
pub(crate) fn ha_member_addresses<'a>(
    props: &'a HashMap<String, String>,
    prefix: &str,
    members: Option<&str>,
    stem: &str,
) -> Vec<&'a str> {
    match members {
        Some(members) => members
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .filter_map(|member| props.get(&format!("{}.{}", prefix, member)))
            .map(String::as_str)
            .collect(),
        None => (1..)
            .map(|index| props.get(&format!("{}.{}{}", prefix, stem, index)))
            .take_while(Option::is_some)
            .flatten()
            .map(String::as_str)
            .collect(),
    }
}

/// Missing and empty properties are the same to URL assembly
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_selection() {
        assert_eq!(scheme_for_policy(Some("HTTPS_ONLY")), "https");
        assert_eq!(scheme_for_policy(Some("HTTP_AND_HTTPS")), "http");
        assert_eq!(scheme_for_policy(None), "http");
        assert_eq!(scheme_for_flag(Some("True")), "https");
        assert_eq!(scheme_for_flag(Some("false")), "http");
        assert_eq!(non_empty(Some("  ")), None);
    }

    #[test]
    fn test_indexed_members_stop_at_first_gap() {
        let props: HashMap<String, String> = [
            ("addr.ns1.nn1", "h1:50070"),
            ("addr.ns1.nn2", "h2:50070"),
            ("addr.ns1.nn4", "h4:50070"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(ha_member_addresses(&props, "addr.ns1", None, "nn"), vec!["h1:50070", "h2:50070"]);
        assert_eq!(
            ha_member_addresses(&props, "addr.ns1", Some("nn4, nn1,nn9"), "nn"),
            vec!["h4:50070", "h1:50070"]
        );
    }
}
