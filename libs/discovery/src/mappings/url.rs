//! Declarative service URL mappings
//!
//! Each logical service maps to a URL template and the definitions of the
//! placeholders it contains:
//!
//! ```yaml
//! JOBTRACKER:
//!   url-pattern: "rpc://{YARN_RM_ADDRESS}"
//!   properties:
//!     YARN_RM_ADDRESS:
//!       component: RESOURCEMANAGER
//!       config-property: yarn.resourcemanager.address
//! ```
//!
//! A placeholder is read from a service configuration (`service-config`),
//! from a component's properties (`component`), from a component's host
//! list (`component` + `hostname: true`), or derived from other
//! placeholders (`config-property` holding an `if` expression, or a plain
//! literal without `component`/`service-config`).

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

use crate::error::{DiscoveryError, Result};
use crate::urls::{UrlPattern, ValueExpr};

/// How one placeholder obtains its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyDef {
    ServiceConfig {
        service: String,
        config_type: String,
        key: String,
    },
    Component {
        component: String,
        key: String,
    },
    /// Fans the URL out once per host of the component
    ComponentHosts { component: String },
    Derived(ValueExpr),
}

#[derive(Debug, Clone, Default)]
pub struct ServiceUrlMapping {
    pattern: Option<UrlPattern>,
    properties: HashMap<String, PropertyDef>,
}

impl ServiceUrlMapping {
    pub fn pattern(&self) -> Option<&UrlPattern> {
        self.pattern.as_ref()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &HashMap<String, PropertyDef> {
        &self.properties
    }
}

/// Compiled mapping document
#[derive(Debug, Clone, Default)]
pub struct UrlMappings {
    services: HashMap<String, ServiceUrlMapping>,
}

impl UrlMappings {
    pub fn from_yaml(source_name: &str, yaml: &str) -> Result<Self> {
        let raw = RawDocument::parse(source_name, yaml)?;
        raw.compile(source_name)
    }

    /// Overlay `overrides` onto `defaults`, then compile
    pub fn merged(defaults: &str, overrides: Option<(&str, &str)>) -> Result<Self> {
        let mut document = RawDocument::parse("built-in URL mappings", defaults)?;
        if let Some((source_name, yaml)) = overrides {
            document.apply(RawDocument::parse(source_name, yaml)?);
        }
        document.compile("URL mappings")
    }

    pub fn service(&self, name: &str) -> Option<&ServiceUrlMapping> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument(BTreeMap<String, RawServiceMapping>);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawServiceMapping {
    url_pattern: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, RawProperty>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawProperty {
    service_config: Option<RawServiceConfigRef>,
    component: Option<String>,
    #[serde(default)]
    hostname: bool,
    config_property: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawServiceConfigRef {
    service: String,
    #[serde(rename = "type")]
    config_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Conditional {
        #[serde(rename = "if")]
        condition: Box<RawCondition>,
    },
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    property: String,
    value: Option<String>,
    then: RawValue,
    #[serde(rename = "else")]
    otherwise: Option<RawValue>,
}

impl RawDocument {
    fn parse(source_name: &str, yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| DiscoveryError::Mapping {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// A service named by the overrides gets their pattern (when given) and
    /// exactly their property set
    fn apply(&mut self, overrides: RawDocument) {
        for (service, mapping) in overrides.0 {
            match self.0.get_mut(&service) {
                Some(existing) => {
                    if mapping.url_pattern.is_some() {
                        existing.url_pattern = mapping.url_pattern;
                    }
                    existing.properties = mapping.properties;
                }
                None => {
                    self.0.insert(service, mapping);
                }
            }
        }
    }

    fn compile(self, source_name: &str) -> Result<UrlMappings> {
        let mut services = HashMap::new();

        for (service, raw) in self.0 {
            let declared: HashSet<&str> = raw.properties.keys().map(String::as_str).collect();
            let mut properties = HashMap::new();

            for (name, property) in &raw.properties {
                let def = property
                    .compile(&declared)
                    .map_err(|message| DiscoveryError::Mapping {
                        source_name: source_name.to_string(),
                        message: format!("{}.{}: {}", service, name, message),
                    })?;

                if let PropertyDef::Derived(expr) = &def {
                    for reference in expr.references() {
                        if !declared.contains(reference) {
                            warn!(
                                "Derived property {}.{} compares undeclared property {}",
                                service, name, reference
                            );
                        }
                    }
                }

                properties.insert(name.clone(), def);
            }

            let mapping = ServiceUrlMapping {
                pattern: raw.url_pattern.map(UrlPattern::new),
                properties,
            };
            services.insert(service, mapping);
        }

        Ok(UrlMappings { services })
    }
}

impl RawProperty {
    fn compile(&self, declared: &HashSet<&str>) -> std::result::Result<PropertyDef, String> {
        // Any conditional makes the property derived
        if let Some(RawValue::Conditional { condition }) = &self.config_property {
            return Ok(PropertyDef::Derived(condition.compile(declared)));
        }

        let key = match &self.config_property {
            Some(RawValue::Text(key)) => Some(key.clone()),
            _ => None,
        };

        if let Some(sc) = &self.service_config {
            let key = key.ok_or("service-config property needs a config-property key")?;
            return Ok(PropertyDef::ServiceConfig {
                service: sc.service.clone(),
                config_type: sc.config_type.clone(),
                key,
            });
        }

        if let Some(component) = &self.component {
            if self.hostname {
                return Ok(PropertyDef::ComponentHosts {
                    component: component.clone(),
                });
            }
            let key = key.ok_or("component property needs a config-property key or hostname")?;
            return Ok(PropertyDef::Component {
                component: component.clone(),
                key,
            });
        }

        key.map(|value| PropertyDef::Derived(ValueExpr::Literal(value)))
            .ok_or_else(|| "property defines no value source".to_string())
    }
}

impl RawCondition {
    fn compile(&self, declared: &HashSet<&str>) -> ValueExpr {
        ValueExpr::Conditional {
            property: self.property.clone(),
            expected: self.value.clone(),
            then: Box::new(self.then.compile_branch(declared)),
            otherwise: self
                .otherwise
                .as_ref()
                .map(|branch| Box::new(branch.compile_branch(declared))),
        }
    }
}

impl RawValue {
    /// A branch naming a declared property reads that property instead
    fn compile_branch(&self, declared: &HashSet<&str>) -> ValueExpr {
        match self {
            RawValue::Text(text) if declared.contains(text.as_str()) => {
                ValueExpr::PropertyRef(text.clone())
            }
            RawValue::Text(text) => ValueExpr::Literal(text.clone()),
            RawValue::Conditional { condition } => condition.compile(declared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: &str = r#"
OOZIE:
  url-pattern: "{OOZIE_ADDRESS}"
  properties:
    OOZIE_ADDRESS:
      component: OOZIE_SERVER
      config-property: oozie.base.url

RESOURCEMANAGER:
  url-pattern: "{SCHEME}://{WEBAPP_ADDRESS}/ws"
  properties:
    HTTP_POLICY:
      component: RESOURCEMANAGER
      config-property: yarn.http.policy
    WEBAPP_HTTP_ADDRESS:
      component: RESOURCEMANAGER
      config-property: yarn.resourcemanager.webapp.address
    SCHEME:
      config-property:
        if:
          property: HTTP_POLICY
          value: HTTPS_ONLY
          then: https
          else: http
    WEBAPP_ADDRESS:
      component: RESOURCEMANAGER
      config-property:
        if:
          property: HTTP_POLICY
          value: HTTPS_ONLY
          then: WEBAPP_HTTPS_ADDRESS
          else: WEBAPP_HTTP_ADDRESS

WEBHBASE:
  url-pattern: "http://{HOST}:60080"
  properties:
    HOST:
      component: HBASE_MASTER
      hostname: true
"#;

    #[test]
    fn test_compiles_property_kinds() {
        let mappings = UrlMappings::from_yaml("test", DEFAULTS).unwrap();

        let rm = mappings.service("RESOURCEMANAGER").unwrap();
        assert_eq!(rm.pattern().unwrap().placeholders(), &["SCHEME", "WEBAPP_ADDRESS"]);
        assert_eq!(
            rm.property("HTTP_POLICY"),
            Some(&PropertyDef::Component {
                component: "RESOURCEMANAGER".to_string(),
                key: "yarn.http.policy".to_string(),
            })
        );

        // Branches naming declared properties become references; others stay literal
        match rm.property("WEBAPP_ADDRESS") {
            Some(PropertyDef::Derived(ValueExpr::Conditional { then, otherwise, .. })) => {
                assert_eq!(**then, ValueExpr::Literal("WEBAPP_HTTPS_ADDRESS".to_string()));
                assert_eq!(
                    otherwise.as_deref(),
                    Some(&ValueExpr::PropertyRef("WEBAPP_HTTP_ADDRESS".to_string()))
                );
            }
            other => panic!("unexpected definition: {:?}", other),
        }

        assert_eq!(
            mappings.service("WEBHBASE").unwrap().property("HOST"),
            Some(&PropertyDef::ComponentHosts {
                component: "HBASE_MASTER".to_string()
            })
        );
    }

    #[test]
    fn test_override_replaces_pattern_and_property_set() {
        let overrides = r#"
OOZIE:
  url-pattern: "{OOZIE_URL}/OVERRIDE"
  properties:
    OOZIE_URL:
      component: OOZIE_SERVER
      config-property: oozie.base.url
DISCOVERYTEST:
  url-pattern: "http://{HOST}:1234/discoveryTest"
  properties:
    HOST:
      component: HBASE_MASTER
      hostname: true
"#;
        let mappings = UrlMappings::merged(DEFAULTS, Some(("override", overrides))).unwrap();

        let oozie = mappings.service("OOZIE").unwrap();
        assert_eq!(oozie.pattern().unwrap().template(), "{OOZIE_URL}/OVERRIDE");
        assert!(oozie.property("OOZIE_ADDRESS").is_none());
        assert!(oozie.property("OOZIE_URL").is_some());

        assert!(mappings.service("DISCOVERYTEST").is_some());
        assert!(mappings.service("RESOURCEMANAGER").is_some());
    }

    #[test]
    fn test_rejects_property_without_source() {
        let yaml = r#"
BROKEN:
  url-pattern: "http://{HOST}"
  properties:
    HOST:
      component: SOMETHING
"#;
        let err = UrlMappings::from_yaml("broken", yaml).unwrap_err();
        assert!(err.to_string().contains("BROKEN.HOST"));
    }
}
