//! Filesystem head-node URLs with HA nameservice selection
//!
//! With `dfs.nameservices` set, one nameservice governs the result:
//! the `discovery-nameservice` parameter when given, otherwise (for several
//! declared nameservices) the one named by `fs.defaultFS`, otherwise the
//! first declared. Its head nodes come from `dfs.ha.namenodes.<ns>` when
//! present, else from indexed `...<ns>.nn1`, `...<ns>.nn2` properties.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::{ha_member_addresses, non_empty, scheme_for_policy, ServiceUrlCreator};
use crate::model::Cluster;

/// Caller parameter naming the nameservice to resolve
pub const NAMESERVICE_PARAM: &str = "discovery-nameservice";

const HDFS_SERVICE: &str = "HDFS";
const HDFS_SITE: &str = "hdfs-site";
const CORE_SITE: &str = "core-site";
const HTTP_POLICY_PROPERTY: &str = "dfs.http.policy";
const HTTP_ADDRESS_PROPERTY: &str = "dfs.namenode.http-address";
const HTTPS_ADDRESS_PROPERTY: &str = "dfs.namenode.https-address";

/// Scheme and head-node web addresses of the selected nameservice
fn namenode_web_addresses(
    cluster: &Cluster,
    params: Option<&HashMap<String, String>>,
) -> Option<(&'static str, Vec<String>)> {
    let sc = cluster.service_configuration(HDFS_SERVICE, HDFS_SITE)?;
    let props = sc.properties();

    let scheme = scheme_for_policy(non_empty(sc.property(HTTP_POLICY_PROPERTY)));
    let address_prefix = if scheme == super::SCHEME_HTTPS {
        HTTPS_ADDRESS_PROPERTY
    } else {
        HTTP_ADDRESS_PROPERTY
    };

    let Some(nameservices) = non_empty(sc.property("dfs.nameservices")) else {
        let addresses = sc
            .property(address_prefix)
            .map(|a| vec![a.to_string()])
            .unwrap_or_default();
        if addresses.is_empty() {
            debug!("No {} in {} of cluster {}", address_prefix, HDFS_SITE, cluster.name());
        }
        return Some((scheme, addresses));
    };

    let declared: Vec<&str> = nameservices.split(',').map(str::trim).collect();
    let requested = params.and_then(|p| p.get(NAMESERVICE_PARAM)).map(String::as_str);
    let ns = select_nameservice(cluster, &declared, requested);

    let members = sc.property(&format!("dfs.ha.namenodes.{}", ns));
    let prefix = format!("{}.{}", address_prefix, ns);
    let addresses = ha_member_addresses(props, &prefix, members, "nn")
        .into_iter()
        .map(str::to_string)
        .collect();

    Some((scheme, addresses))
}

fn select_nameservice(cluster: &Cluster, declared: &[&str], requested: Option<&str>) -> String {
    if let Some(requested) = requested {
        if !declared.contains(&requested) {
            warn!(
                "Requested nameservice {} is not declared by cluster {} ({}); using it anyway",
                requested,
                cluster.name(),
                declared.join(",")
            );
        }
        return requested.to_string();
    }

    if declared.len() > 1 {
        // fs.defaultFS looks like hdfs://ns1
        let default_fs = cluster
            .service_configuration(HDFS_SERVICE, CORE_SITE)
            .and_then(|core| core.property("fs.defaultFS"));
        if let Some(default_fs) = default_fs {
            let ns = default_fs.rsplit('/').next().unwrap_or(default_fs);
            return ns.to_string();
        }
    }

    declared.first().copied().unwrap_or_default().to_string()
}

/// `WEBHDFS`: `{scheme}://{address}/webhdfs` per selected head node
#[derive(Debug, Default, Clone, Copy)]
pub struct WebHdfsUrlCreator;

impl ServiceUrlCreator for WebHdfsUrlCreator {
    fn target_service(&self) -> &str {
        "WEBHDFS"
    }

    fn create(&self, cluster: &Cluster, params: Option<&HashMap<String, String>>) -> Vec<String> {
        namenode_web_addresses(cluster, params)
            .map(|(scheme, addresses)| {
                addresses
                    .iter()
                    .map(|address| format!("{}://{}/webhdfs", scheme, address))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `HDFSUI`: `{scheme}://{address}` per selected head node
#[derive(Debug, Default, Clone, Copy)]
pub struct HdfsUiUrlCreator;

impl ServiceUrlCreator for HdfsUiUrlCreator {
    fn target_service(&self) -> &str {
        "HDFSUI"
    }

    fn create(&self, cluster: &Cluster, params: Option<&HashMap<String, String>>) -> Vec<String> {
        namenode_web_addresses(cluster, params)
            .map(|(scheme, addresses)| {
                addresses
                    .iter()
                    .map(|address| format!("{}://{}", scheme, address))
                    .collect()
            })
            .unwrap_or_default()
    }
}
