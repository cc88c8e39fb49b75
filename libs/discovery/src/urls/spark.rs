//! Spark history, thrift server and Livy UI URLs
//!
//! Each exists in a first and second generation component; the first
//! generation wins when a cluster runs both.

use std::collections::HashMap;
use tracing::debug;

use super::{is_true, non_empty, scheme_for_flag, ServiceUrlCreator, SCHEME_HTTP, SCHEME_HTTPS};
use crate::model::{Cluster, Component};

const HISTORY_SERVERS: &[&str] = &["SPARK_JOBHISTORYSERVER", "SPARK2_JOBHISTORYSERVER"];
const THRIFT_SERVERS: &[&str] = &["SPARK_THRIFTSERVER", "SPARK2_THRIFTSERVER"];
const LIVY_SERVERS: &[&str] = &["LIVY_SERVER", "LIVY2_SERVER"];

// History server SSL port when only the plain UI port is configured
const HISTORY_SSL_PORT_OFFSET: u16 = 400;

fn first_component<'a>(cluster: &'a Cluster, names: &[&str]) -> Option<&'a Component> {
    names.iter().find_map(|name| cluster.component(name))
}

fn per_host(component: &Component, scheme: &str, port: &str, path: &str) -> Vec<String> {
    component
        .host_names()
        .iter()
        .map(|host| format!("{}://{}:{}{}", scheme, host, port, path))
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SparkHistoryUiUrlCreator;

impl ServiceUrlCreator for SparkHistoryUiUrlCreator {
    fn target_service(&self) -> &str {
        "SPARKHISTORYUI"
    }

    fn create(&self, cluster: &Cluster, _params: Option<&HashMap<String, String>>) -> Vec<String> {
        let Some(component) = first_component(cluster, HISTORY_SERVERS) else {
            return Vec::new();
        };

        let ui_port = non_empty(component.property("spark.history.ui.port"));
        let ssl = is_true(component.property("spark.ssl.historyServer.enabled"))
            || is_true(component.property("spark.ssl.enabled"));

        let (scheme, port) = if ssl {
            let port = non_empty(component.property("spark.ssl.historyServer.port"))
                .map(str::to_string)
                .or_else(|| {
                    ui_port
                        .and_then(|p| p.parse::<u16>().ok())
                        .and_then(|p| p.checked_add(HISTORY_SSL_PORT_OFFSET))
                        .map(|p| p.to_string())
                });
            (SCHEME_HTTPS, port)
        } else {
            (SCHEME_HTTP, ui_port.map(str::to_string))
        };

        match port {
            Some(port) => per_host(component, scheme, &port, ""),
            None => {
                debug!("No history UI port on {}", component.name());
                Vec::new()
            }
        }
    }
}

/// Only thrift servers in HTTP transport mode expose a UI endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct SparkThriftServerUiUrlCreator;

impl ServiceUrlCreator for SparkThriftServerUiUrlCreator {
    fn target_service(&self) -> &str {
        "THRIFTSERVERUI"
    }

    fn create(&self, cluster: &Cluster, _params: Option<&HashMap<String, String>>) -> Vec<String> {
        let Some(component) = first_component(cluster, THRIFT_SERVERS) else {
            return Vec::new();
        };

        let http_mode = component
            .property("hive.server2.transport.mode")
            .map_or(false, |mode| mode.trim().eq_ignore_ascii_case("http"));
        if !http_mode {
            debug!("{} is not in HTTP transport mode", component.name());
            return Vec::new();
        }

        let Some(port) = non_empty(component.property("hive.server2.thrift.http.port")) else {
            return Vec::new();
        };
        let path = non_empty(component.property("hive.server2.http.endpoint"))
            .map(|endpoint| format!("/{}", endpoint.trim_start_matches('/')))
            .unwrap_or_default();
        let scheme = scheme_for_flag(component.property("hive.server2.use.SSL"));

        per_host(component, scheme, port, &path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LivyUrlCreator;

impl ServiceUrlCreator for LivyUrlCreator {
    fn target_service(&self) -> &str {
        "LIVYSERVER"
    }

    fn create(&self, cluster: &Cluster, _params: Option<&HashMap<String, String>>) -> Vec<String> {
        let Some(component) = first_component(cluster, LIVY_SERVERS) else {
            return Vec::new();
        };
        let Some(port) = non_empty(component.property("livy.server.port")) else {
            return Vec::new();
        };

        let scheme = if non_empty(component.property("livy.keystore")).is_some() {
            SCHEME_HTTPS
        } else {
            SCHEME_HTTP
        };

        per_host(component, scheme, port, "")
    }
}
