use std::collections::HashMap;
use tracing::debug;

use super::{ha_member_addresses, is_true, non_empty, scheme_for_policy, ServiceUrlCreator, SCHEME_HTTPS};
use crate::model::Cluster;

const YARN_SERVICE: &str = "YARN";
const YARN_SITE: &str = "yarn-site";
const WEBAPP_HTTP_ADDRESS: &str = "yarn.resourcemanager.webapp.address";
const WEBAPP_HTTPS_ADDRESS: &str = "yarn.resourcemanager.webapp.https.address";

/// `YARNUI`: one `{scheme}://{address}` per resource manager
///
/// With `yarn.resourcemanager.ha.enabled`, addresses come from
/// `<webapp address>.<rm-id>` for each id in `yarn.resourcemanager.ha.rm-ids`,
/// or from `<webapp address>.rm1`, `.rm2`, ... when no ids are listed.
#[derive(Debug, Default, Clone, Copy)]
pub struct YarnUiUrlCreator;

impl ServiceUrlCreator for YarnUiUrlCreator {
    fn target_service(&self) -> &str {
        "YARNUI"
    }

    fn create(&self, cluster: &Cluster, _params: Option<&HashMap<String, String>>) -> Vec<String> {
        let Some(sc) = cluster.service_configuration(YARN_SERVICE, YARN_SITE) else {
            debug!("No {} configuration in cluster {}", YARN_SITE, cluster.name());
            return Vec::new();
        };

        let scheme = scheme_for_policy(non_empty(sc.property("yarn.http.policy")));
        let address_property = if scheme == SCHEME_HTTPS {
            WEBAPP_HTTPS_ADDRESS
        } else {
            WEBAPP_HTTP_ADDRESS
        };

        let addresses: Vec<&str> = if is_true(sc.property("yarn.resourcemanager.ha.enabled")) {
            let rm_ids = non_empty(sc.property("yarn.resourcemanager.ha.rm-ids"));
            ha_member_addresses(sc.properties(), address_property, rm_ids, "rm")
        } else {
            sc.property(address_property).into_iter().collect()
        };

        addresses
            .into_iter()
            .map(|address| format!("{}://{}", scheme, address))
            .collect()
    }
}
