//! Topology monitor entry point
//!
//! Discovers the configured cluster plus every cluster a previous run left
//! behind, then polls them for configuration drift until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use gateway_config::GatewayConfig;
use topology_discovery::client::EnvAliasService;
use topology_discovery::{
    CacheInvalidatingListener, ConfigurationChangeListener, ConfigurationMonitor, DiscoveryCache,
    DiscoveryConfig, HttpManagerApi, Mappings, ServiceDiscovery,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment overlay (e.g. "production" loads environments/production.toml next to the config file)
    #[arg(short, long)]
    environment: Option<String>,

    /// Prefix of the environment variables holding alias values
    #[arg(long, default_value = "GATEWAY_ALIAS")]
    alias_prefix: String,

    /// Discover once and exit without monitoring
    #[arg(long)]
    once: bool,
}

struct LoggingListener;

impl ConfigurationChangeListener for LoggingListener {
    fn on_configuration_change(&self, source_address: &str, cluster_name: &str) {
        info!(
            "Configuration of {} at {} changed, topology will be rediscovered",
            cluster_name, source_address
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("topology_monitor=info".parse()?)
                .add_directive("topology_discovery=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!("Starting topology monitor");

    let config = GatewayConfig::load(args.config.as_deref(), args.environment.as_deref())
        .context("Failed to load gateway configuration")?;

    let mappings = Mappings::load(&config).context("Failed to load discovery mappings")?;
    let api = Arc::new(HttpManagerApi::new(&config.discovery).context("Failed to build manager client")?);
    let aliases = Arc::new(EnvAliasService::new(args.alias_prefix.as_str()));
    let cache = Arc::new(DiscoveryCache::new(&config.discovery));
    let monitor = Arc::new(ConfigurationMonitor::from_config(&config));

    monitor.add_listener(Arc::new(CacheInvalidatingListener::new(Arc::clone(&cache))));
    monitor.add_listener(Arc::new(LoggingListener));

    let discovery = Arc::new(
        ServiceDiscovery::new(&config.discovery, api, aliases, mappings, cache)
            .with_monitor(Arc::clone(&monitor)),
    );

    let mut requests = vec![DiscoveryConfig::default()];
    for key in monitor.tracked_clusters() {
        if let Some(tracked) = monitor.discovery_config(&key.address, &key.cluster) {
            requests.push(tracked);
        }
    }

    for request in &requests {
        match discovery.discover(&config, request, None).await {
            Ok(Some(cluster)) => {
                info!(
                    "Discovered cluster {} with {} components",
                    cluster.name(),
                    cluster.components().len()
                );
                for url in cluster.service_urls("NAMENODE", None) {
                    info!("  NAMENODE -> {}", url);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Discovery failed: {}", e),
        }
    }

    if args.once || !config.monitor.enabled {
        info!("Monitoring disabled, exiting");
        return Ok(());
    }

    monitor.start(discovery);
    info!("Watching {} clusters", monitor.tracked_clusters().len());

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    monitor.shutdown().await;

    Ok(())
}
