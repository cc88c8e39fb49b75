//! Manager credentials resolved through secret aliases

use std::collections::HashMap;
use std::fmt;

use gateway_config::DiscoverySettings;

use crate::error::{DiscoveryError, Result};
use crate::identity::DiscoveryConfig;

/// External secret store, queried by alias
pub trait AliasService: Send + Sync {
    fn resolve(&self, alias: &str) -> Option<String>;
}

/// In-memory aliases, for tests and embedded use
#[derive(Default, Clone)]
pub struct MapAliasService {
    aliases: HashMap<String, String>,
}

impl MapAliasService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, alias: impl Into<String>, value: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), value.into());
        self
    }
}

impl AliasService for MapAliasService {
    fn resolve(&self, alias: &str) -> Option<String> {
        self.aliases.get(alias).cloned()
    }
}

impl fmt::Debug for MapAliasService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapAliasService")
            .field("aliases", &self.aliases.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Aliases read from the process environment
///
/// Alias `cluster.discovery.password` with prefix `GATEWAY_ALIAS` is read
/// from `GATEWAY_ALIAS_CLUSTER_DISCOVERY_PASSWORD`.
#[derive(Debug, Clone)]
pub struct EnvAliasService {
    prefix: String,
}

impl EnvAliasService {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn variable_name(&self, alias: &str) -> String {
        let suffix: String = alias
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}_{}", self.prefix, suffix)
    }
}

impl AliasService for EnvAliasService {
    fn resolve(&self, alias: &str) -> Option<String> {
        std::env::var(self.variable_name(alias))
            .ok()
            .filter(|value| !value.is_empty())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Explicit user, else the default user alias; password from the
    /// configured alias, else the default password alias
    pub fn resolve(
        address: &str,
        config: &DiscoveryConfig,
        settings: &DiscoverySettings,
        aliases: &dyn AliasService,
    ) -> Result<Self> {
        let missing = |reason: String| DiscoveryError::MissingCredentials {
            address: address.to_string(),
            reason,
        };

        let user = match config.user.as_deref().filter(|u| !u.is_empty()) {
            Some(user) => user.to_string(),
            None => aliases.resolve(&settings.default_user_alias).ok_or_else(|| {
                missing(format!(
                    "no user configured and alias {} is not set",
                    settings.default_user_alias
                ))
            })?,
        };

        let alias = config
            .password_alias
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(&settings.default_password_alias);
        let password = aliases
            .resolve(alias)
            .ok_or_else(|| missing(format!("password alias {} is not set", alias)))?;

        Ok(Self { user, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DiscoverySettings {
        gateway_config::GatewayConfig::default().discovery
    }

    #[test]
    fn test_explicit_user_and_cluster_alias() {
        let aliases = MapAliasService::new()
            .with_alias("c1.password", "s3cret")
            .with_alias("cluster.discovery.user", "fallback");
        let config = DiscoveryConfig::new("http://m:7180", "c1")
            .with_user("admin")
            .with_password_alias("c1.password");

        let creds = Credentials::resolve("http://m:7180", &config, &settings(), &aliases).unwrap();
        assert_eq!(creds, Credentials::new("admin", "s3cret"));
    }

    #[test]
    fn test_default_aliases() {
        let aliases = MapAliasService::new()
            .with_alias("cluster.discovery.user", "discovery")
            .with_alias("cluster.discovery.password", "pw");
        let config = DiscoveryConfig::new("http://m:7180", "c1");

        let creds = Credentials::resolve("http://m:7180", &config, &settings(), &aliases).unwrap();
        assert_eq!(creds, Credentials::new("discovery", "pw"));
    }

    #[test]
    fn test_missing_password_is_an_error() {
        let aliases = MapAliasService::new();
        let config = DiscoveryConfig::new("http://m:7180", "c1").with_user("admin");

        let err = Credentials::resolve("http://m:7180", &config, &settings(), &aliases).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingCredentials { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("admin", "s3cret"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_env_variable_name() {
        let aliases = EnvAliasService::new("GATEWAY_ALIAS");
        assert_eq!(
            aliases.variable_name("cluster.discovery.password"),
            "GATEWAY_ALIAS_CLUSTER_DISCOVERY_PASSWORD"
        );
    }
}
