//! Role Collector
//!
//! Pulls every role of a service together with its configuration. Two
//! strategies, selected by [`RoleFetchStrategy`]:
//!
//! - [`ByRoleCollector`] pages through the role list and fetches each
//!   role's configuration separately. Excluded role types are dropped before
//!   their configuration is fetched.
//! - [`ByServiceCollector`] pages through the service-level role
//!   configuration and drops excluded role types afterwards.
//!
//! Paging stops at the first page that is missing, empty, or shorter than
//! the page size.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

use gateway_config::{DiscoverySettings, RoleFetchStrategy};

use super::{ManagerApi, ManagerEndpoint, RoleConfig};
use crate::error::Result;

/// Excludes role types by name, ignoring ASCII case
#[derive(Debug, Clone, Default)]
pub struct TypeNameFilter {
    excluded: HashSet<String>,
}

impl TypeNameFilter {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded: excluded
                .into_iter()
                .map(|name| name.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_excluded(&self, role_type: &str) -> bool {
        self.excluded.contains(&role_type.to_ascii_uppercase())
    }
}

#[async_trait]
pub trait RoleCollector: Send + Sync {
    async fn collect(
        &self,
        api: &dyn ManagerApi,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
    ) -> Result<Vec<RoleConfig>>;
}

/// Collector for the configured strategy
pub fn collector_for(settings: &DiscoverySettings) -> Box<dyn RoleCollector> {
    let filter = TypeNameFilter::new(&settings.excluded_role_types);
    match settings.role_fetch_strategy {
        RoleFetchStrategy::ByRole => Box::new(ByRoleCollector::new(settings.page_size, filter)),
        RoleFetchStrategy::ByService => Box::new(ByServiceCollector::new(settings.page_size, filter)),
    }
}

/// `Some(next offset)` while the page was full
fn next_offset(offset: u32, page_len: usize, page_size: u32) -> Option<u32> {
    if page_len == 0 || page_len < page_size as usize {
        None
    } else {
        Some(offset + page_size)
    }
}

#[derive(Debug, Clone)]
pub struct ByRoleCollector {
    page_size: u32,
    filter: TypeNameFilter,
}

impl ByRoleCollector {
    pub fn new(page_size: u32, filter: TypeNameFilter) -> Self {
        Self {
            page_size: page_size.max(1),
            filter,
        }
    }
}

#[async_trait]
impl RoleCollector for ByRoleCollector {
    async fn collect(
        &self,
        api: &dyn ManagerApi,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
    ) -> Result<Vec<RoleConfig>> {
        let mut collected = Vec::new();
        let mut offset = 0;

        loop {
            let Some(roles) = api
                .read_roles(endpoint, cluster, service, self.page_size, offset)
                .await?
            else {
                break;
            };
            let page_len = roles.len();

            for role in roles {
                if self.filter.is_excluded(&role.role_type) {
                    debug!("Skipping excluded role {} of type {}", role.name, role.role_type);
                    continue;
                }
                match api.read_role_config(endpoint, cluster, service, &role.name).await? {
                    Some(properties) => collected.push(RoleConfig { role, properties }),
                    None => debug!("Role {} reported no configuration", role.name),
                }
            }

            match next_offset(offset, page_len, self.page_size) {
                Some(next) => offset = next,
                None => break,
            }
        }

        Ok(collected)
    }
}

#[derive(Debug, Clone)]
pub struct ByServiceCollector {
    page_size: u32,
    filter: TypeNameFilter,
}

impl ByServiceCollector {
    pub fn new(page_size: u32, filter: TypeNameFilter) -> Self {
        Self {
            page_size: page_size.max(1),
            filter,
        }
    }
}

#[async_trait]
impl RoleCollector for ByServiceCollector {
    async fn collect(
        &self,
        api: &dyn ManagerApi,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
    ) -> Result<Vec<RoleConfig>> {
        let mut collected = Vec::new();
        let mut offset = 0;

        loop {
            let Some(page) = api
                .read_roles_config(endpoint, cluster, service, self.page_size, offset)
                .await?
            else {
                break;
            };
            let page_len = page.len();
            collected.extend(page);

            match next_offset(offset, page_len, self.page_size) {
                Some(next) => offset = next,
                None => break,
            }
        }

        collected.retain(|config| {
            let keep = !self.filter.is_excluded(&config.role.role_type);
            if !keep {
                debug!("Skipping excluded role {} of type {}", config.role.name, config.role.role_type);
            }
            keep
        });
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Credentials, RoleSummary, ServiceSummary};
    use crate::error::DiscoveryError;
    use crate::model::ServiceConfiguration;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Serves canned pages and records every paged call
    #[derive(Default)]
    struct PagedApi {
        role_pages: Vec<Option<Vec<RoleSummary>>>,
        config_pages: Vec<Option<Vec<RoleConfig>>>,
        fail_role_config: bool,
        offsets: Mutex<Vec<u32>>,
        role_config_reads: Mutex<Vec<String>>,
    }

    impl PagedApi {
        fn page<T: Clone>(&self, pages: &[Option<Vec<T>>], limit: u32, offset: u32) -> Option<Vec<T>> {
            self.offsets.lock().push(offset);
            pages
                .get((offset / limit) as usize)
                .cloned()
                .unwrap_or(Some(Vec::new()))
        }
    }

    #[async_trait]
    impl ManagerApi for PagedApi {
        async fn list_clusters(&self, _: &ManagerEndpoint) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn list_services(&self, _: &ManagerEndpoint, _: &str) -> Result<Vec<ServiceSummary>> {
            Ok(Vec::new())
        }

        async fn current_config_versions(
            &self,
            _: &ManagerEndpoint,
            _: &str,
            _: &str,
        ) -> Result<Vec<ServiceConfiguration>> {
            Ok(Vec::new())
        }

        async fn read_roles(
            &self,
            _: &ManagerEndpoint,
            _: &str,
            _: &str,
            limit: u32,
            offset: u32,
        ) -> Result<Option<Vec<RoleSummary>>> {
            Ok(self.page(&self.role_pages, limit, offset))
        }

        async fn read_role_config(
            &self,
            _: &ManagerEndpoint,
            _: &str,
            _: &str,
            role: &str,
        ) -> Result<Option<HashMap<String, String>>> {
            if self.fail_role_config {
                return Err(DiscoveryError::HttpStatus {
                    url: format!("http://m/roles/{}/config", role),
                    status: 500,
                });
            }
            self.role_config_reads.lock().push(role.to_string());
            Ok(Some(HashMap::from([("role".to_string(), role.to_string())])))
        }

        async fn read_roles_config(
            &self,
            _: &ManagerEndpoint,
            _: &str,
            _: &str,
            limit: u32,
            offset: u32,
        ) -> Result<Option<Vec<RoleConfig>>> {
            Ok(self.page(&self.config_pages, limit, offset))
        }
    }

    fn endpoint() -> ManagerEndpoint {
        ManagerEndpoint::new("http://m:7180", Credentials::new("admin", "pw"))
    }

    fn role(name: &str, role_type: &str) -> RoleSummary {
        RoleSummary {
            name: name.to_string(),
            role_type: role_type.to_string(),
            host_name: Some(format!("{}.example.com", name)),
        }
    }

    fn role_config(name: &str, role_type: &str) -> RoleConfig {
        RoleConfig {
            role: role(name, role_type),
            properties: HashMap::new(),
        }
    }

    fn config_page(start: usize, len: usize) -> Option<Vec<RoleConfig>> {
        Some(
            (start..start + len)
                .map(|i| role_config(&format!("role-{}", i), "DATANODE"))
                .collect(),
        )
    }

    fn names(configs: &[RoleConfig]) -> Vec<String> {
        configs.iter().map(|c| c.role.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_full_pages_then_empty_page() {
        let api = PagedApi {
            config_pages: vec![config_page(0, 3), config_page(3, 3), Some(Vec::new())],
            ..Default::default()
        };
        let collector = ByServiceCollector::new(3, TypeNameFilter::allow_all());

        let collected = collector.collect(&api, &endpoint(), "c1", "hdfs").await.unwrap();

        let expected: Vec<String> = (0..6).map(|i| format!("role-{}", i)).collect();
        assert_eq!(names(&collected), expected);
        assert_eq!(*api.offsets.lock(), vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn test_partial_page_stops_without_further_request() {
        let api = PagedApi {
            config_pages: vec![config_page(0, 2)],
            ..Default::default()
        };
        let collector = ByServiceCollector::new(3, TypeNameFilter::allow_all());

        let collected = collector.collect(&api, &endpoint(), "c1", "hdfs").await.unwrap();

        assert_eq!(collected.len(), 2);
        assert_eq!(*api.offsets.lock(), vec![0]);
    }

    #[tokio::test]
    async fn test_null_page_is_an_empty_page() {
        let api = PagedApi {
            config_pages: vec![config_page(0, 3), None],
            ..Default::default()
        };
        let collector = ByServiceCollector::new(3, TypeNameFilter::allow_all());

        let collected = collector.collect(&api, &endpoint(), "c1", "hdfs").await.unwrap();
        assert_eq!(collected.len(), 3);
        assert_eq!(*api.offsets.lock(), vec![0, 3]);
    }

    #[tokio::test]
    async fn test_by_service_filters_after_fetch() {
        let api = PagedApi {
            config_pages: vec![Some(vec![
                role_config("hive-HIVESERVER2-1", "HIVESERVER2"),
                role_config("hive-GATEWAY-1", "GATEWAY"),
            ])],
            ..Default::default()
        };
        let collector = ByServiceCollector::new(10, TypeNameFilter::new(["gateway"]));

        let collected = collector.collect(&api, &endpoint(), "c1", "hive").await.unwrap();
        assert_eq!(names(&collected), ["hive-HIVESERVER2-1"]);
    }

    #[tokio::test]
    async fn test_by_role_skips_excluded_before_config_fetch() {
        let api = PagedApi {
            role_pages: vec![Some(vec![
                role("hive-HIVESERVER2-1", "HIVESERVER2"),
                role("hive-GATEWAY-1", "GATEWAY"),
            ])],
            ..Default::default()
        };
        let collector = ByRoleCollector::new(10, TypeNameFilter::new(["GATEWAY"]));

        let collected = collector.collect(&api, &endpoint(), "c1", "hive").await.unwrap();

        assert_eq!(names(&collected), ["hive-HIVESERVER2-1"]);
        assert_eq!(*api.role_config_reads.lock(), vec!["hive-HIVESERVER2-1".to_string()]);
        assert_eq!(
            collected[0].role.host_name.as_deref(),
            Some("hive-HIVESERVER2-1.example.com")
        );
    }

    #[tokio::test]
    async fn test_by_role_with_missing_role_list() {
        let api = PagedApi {
            role_pages: vec![None],
            ..Default::default()
        };
        let collector = ByRoleCollector::new(10, TypeNameFilter::allow_all());

        let collected = collector.collect(&api, &endpoint(), "c1", "hive").await.unwrap();
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_by_role_propagates_config_failure() {
        let api = PagedApi {
            role_pages: vec![Some(vec![role("hive-HIVESERVER2-1", "HIVESERVER2")])],
            fail_role_config: true,
            ..Default::default()
        };
        let collector = ByRoleCollector::new(10, TypeNameFilter::allow_all());

        let err = collector.collect(&api, &endpoint(), "c1", "hive").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::HttpStatus { status: 500, .. }));
    }
}
