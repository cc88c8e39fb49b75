/// Coordination-service settings a gateway needs for HA dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaConfig {
    pub enabled: bool,
    pub ensemble: Option<String>,
    pub namespace: Option<String>,
}

impl HaConfig {
    /// Build from raw property values; a given port replaces each member's port
    pub fn from_values(
        enabled: Option<&str>,
        ensemble: Option<&str>,
        port: Option<&str>,
        namespace: Option<&str>,
    ) -> Self {
        let ensemble = match (ensemble, port) {
            (Some(ensemble), Some(port)) => Some(apply_port(ensemble, port)),
            (ensemble, _) => ensemble.map(str::to_string),
        };

        Self {
            enabled: enabled.map_or(true, |v| v.trim().eq_ignore_ascii_case("true")),
            ensemble,
            namespace: namespace.map(str::to_string),
        }
    }
}

fn apply_port(ensemble: &str, port: &str) -> String {
    ensemble
        .split(',')
        .map(|member| {
            let host = member.split_once(':').map_or(member, |(host, _)| host);
            format!("{}:{}", host.trim(), port)
        })
        .collect::<Vec<_>>()
        .join(",")
}
