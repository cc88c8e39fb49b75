//! Bounded retry of transient manager failures
//!
//! Timeouts and connection failures are retried immediately, up to the
//! configured number of attempts. Anything else propagates on first sight.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use super::{ManagerApi, ManagerEndpoint, RoleConfig, RoleSummary, ServiceSummary};
use crate::error::Result;
use crate::model::ServiceConfiguration;

/// Run `call` until it succeeds, fails permanently, or attempts run out
pub async fn with_retries<T, F, Fut>(max_attempts: u32, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    "{} failed at {} (attempt {} of {}): {}",
                    operation,
                    e.url().unwrap_or("<unknown>"),
                    attempt,
                    max_attempts,
                    e
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// [`ManagerApi`] decorator applying [`with_retries`] to every call
#[derive(Clone)]
pub struct RetryingManagerApi {
    inner: Arc<dyn ManagerApi>,
    max_attempts: u32,
}

impl RetryingManagerApi {
    pub fn new(inner: Arc<dyn ManagerApi>, max_attempts: u32) -> Self {
        Self { inner, max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[async_trait]
impl ManagerApi for RetryingManagerApi {
    async fn list_clusters(&self, endpoint: &ManagerEndpoint) -> Result<Vec<String>> {
        with_retries(self.max_attempts, "List clusters", || {
            self.inner.list_clusters(endpoint)
        })
        .await
    }

    async fn list_services(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
    ) -> Result<Vec<ServiceSummary>> {
        with_retries(self.max_attempts, "List services", || {
            self.inner.list_services(endpoint, cluster)
        })
        .await
    }

    async fn current_config_versions(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
    ) -> Result<Vec<ServiceConfiguration>> {
        with_retries(self.max_attempts, "Read configuration versions", || {
            self.inner.current_config_versions(endpoint, cluster, service)
        })
        .await
    }

    async fn read_roles(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<Vec<RoleSummary>>> {
        with_retries(self.max_attempts, "Read roles", || {
            self.inner.read_roles(endpoint, cluster, service, limit, offset)
        })
        .await
    }

    async fn read_role_config(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        role: &str,
    ) -> Result<Option<HashMap<String, String>>> {
        with_retries(self.max_attempts, "Read role configuration", || {
            self.inner.read_role_config(endpoint, cluster, service, role)
        })
        .await
    }

    async fn read_roles_config(
        &self,
        endpoint: &ManagerEndpoint,
        cluster: &str,
        service: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<Vec<RoleConfig>>> {
        with_retries(self.max_attempts, "Read service role configuration", || {
            self.inner.read_roles_config(endpoint, cluster, service, limit, offset)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn timeout() -> DiscoveryError {
        DiscoveryError::Timeout {
            url: "http://m:7180/api/v1/clusters".to_string(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retries(3, "List clusters", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(timeout())
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_propagate() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retries(3, "List clusters", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(timeout())
        })
        .await;

        assert!(matches!(result, Err(DiscoveryError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retries(3, "List clusters", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(DiscoveryError::HttpStatus {
                url: "http://m:7180/api/v1/clusters".to_string(),
                status: 401,
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
