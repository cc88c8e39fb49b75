//! Derived property values
//!
//! A derived placeholder is computed from other placeholders of the same
//! service through a small conditional expression:
//!
//! ```yaml
//! SCHEME:
//!   config-property:
//!     if:
//!       property: HTTP_POLICY
//!       value: HTTPS_ONLY
//!       then: https
//!       else: http
//! ```
//!
//! Branches are literals, references to another declared property, or
//! nested conditionals. A conditional without `value` tests whether the
//! compared property has any value at all.

/// Expression tree of a derived property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpr {
    Literal(String),
    /// Name of another property declared for the same service
    PropertyRef(String),
    Conditional {
        property: String,
        expected: Option<String>,
        then: Box<ValueExpr>,
        otherwise: Option<Box<ValueExpr>>,
    },
}

/// Source of the actual values of declared properties
pub trait PropertyLookup {
    fn lookup(&self, property: &str) -> Option<String>;
}

impl<F> PropertyLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, property: &str) -> Option<String> {
        self(property)
    }
}

impl ValueExpr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn conditional(
        property: impl Into<String>,
        expected: Option<&str>,
        then: ValueExpr,
        otherwise: Option<ValueExpr>,
    ) -> Self {
        Self::Conditional {
            property: property.into(),
            expected: expected.map(str::to_string),
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn evaluate(&self, values: &dyn PropertyLookup) -> Option<String> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::PropertyRef(name) => values.lookup(name),
            Self::Conditional {
                property,
                expected,
                then,
                otherwise,
            } => {
                let actual = values.lookup(property);
                let matched = match expected {
                    Some(expected) => actual.as_deref() == Some(expected.as_str()),
                    None => actual.is_some(),
                };

                if matched {
                    then.evaluate(values)
                } else {
                    otherwise.as_ref().and_then(|branch| branch.evaluate(values))
                }
            }
        }
    }

    /// Names of the properties this expression reads
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::PropertyRef(name) => names.push(name),
            Self::Conditional {
                property,
                then,
                otherwise,
                ..
            } => {
                names.push(property);
                then.collect_references(names);
                if let Some(branch) = otherwise {
                    branch.collect_references(names);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn scheme_expr() -> ValueExpr {
        ValueExpr::conditional(
            "HTTP_POLICY",
            Some("HTTPS_ONLY"),
            ValueExpr::literal("https"),
            Some(ValueExpr::literal("http")),
        )
    }

    #[test]
    fn test_equality_condition() {
        let expr = scheme_expr();

        assert_eq!(expr.evaluate(&lookup(&[("HTTP_POLICY", "HTTPS_ONLY")])).as_deref(), Some("https"));
        assert_eq!(expr.evaluate(&lookup(&[("HTTP_POLICY", "HTTP_ONLY")])).as_deref(), Some("http"));
        assert_eq!(expr.evaluate(&lookup(&[])).as_deref(), Some("http"));
    }

    #[test]
    fn test_presence_condition_with_property_branches() {
        let expr = ValueExpr::conditional(
            "DFS_NAMESERVICES",
            None,
            ValueExpr::PropertyRef("DFS_NAMESERVICES".to_string()),
            Some(ValueExpr::PropertyRef("DFS_NAMENODE_RPC_ADDRESS".to_string())),
        );

        let ha = lookup(&[("DFS_NAMESERVICES", "ns1"), ("DFS_NAMENODE_RPC_ADDRESS", "nn:8020")]);
        let single = lookup(&[("DFS_NAMENODE_RPC_ADDRESS", "nn:8020")]);

        assert_eq!(expr.evaluate(&ha).as_deref(), Some("ns1"));
        assert_eq!(expr.evaluate(&single).as_deref(), Some("nn:8020"));
    }

    #[test]
    fn test_missing_else_yields_nothing() {
        let expr = ValueExpr::conditional("USE_SSL", Some("true"), ValueExpr::literal("https"), None);

        assert_eq!(expr.evaluate(&lookup(&[("USE_SSL", "false")])), None);
    }

    #[test]
    fn test_nested_conditionals() {
        let expr = ValueExpr::conditional(
            "MODE",
            Some("http"),
            ValueExpr::conditional(
                "USE_SSL",
                Some("true"),
                ValueExpr::literal("https"),
                Some(ValueExpr::literal("http")),
            ),
            Some(ValueExpr::literal("binary")),
        );

        assert_eq!(
            expr.evaluate(&lookup(&[("MODE", "http"), ("USE_SSL", "true")])).as_deref(),
            Some("https")
        );
        assert_eq!(expr.evaluate(&lookup(&[("MODE", "http")])).as_deref(), Some("http"));
        assert_eq!(expr.evaluate(&lookup(&[("MODE", "tcp")])).as_deref(), Some("binary"));
        assert_eq!(expr.references(), vec!["MODE", "USE_SSL"]);
    }
}
