//! URL templates with `{PLACEHOLDER}` tokens

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{(.*?)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    template: String,
    placeholders: Vec<String>,
}

impl UrlPattern {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut placeholders: Vec<String> = Vec::new();
        for captures in PLACEHOLDER.captures_iter(&template) {
            if let Some(name) = captures.get(1) {
                if !placeholders.iter().any(|p| p == name.as_str()) {
                    placeholders.push(name.as_str().to_string());
                }
            }
        }

        Self {
            template,
            placeholders,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Substitute resolved values verbatim; unresolved tokens stay in place
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        substitute(&self.template, values)
    }
}

/// Single pass over the template; substituted values are never expanded again
pub fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |captures: &Captures| match values.get(&captures[1]) {
            Some(value) => value.clone(),
            None => captures[0].to_string(),
        })
        .into_owned()
}

/// Whether any `{...}` token survived substitution
pub fn has_unresolved(url: &str) -> bool {
    PLACEHOLDER.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_in_order() {
        let pattern = UrlPattern::new("{SCHEME}://{HOST}:{PORT}/{PATH}?h={HOST}");
        assert_eq!(pattern.placeholders(), &["SCHEME", "HOST", "PORT", "PATH"]);
    }

    #[test]
    fn test_render_leaves_unresolved_tokens() {
        let pattern = UrlPattern::new("{SCHEME}://{HOST}:{PORT}/ws");
        let values: HashMap<String, String> = [("SCHEME", "https"), ("HOST", "rm1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let url = pattern.render(&values);
        assert_eq!(url, "https://rm1:{PORT}/ws");
        assert!(has_unresolved(&url));
        assert!(!has_unresolved("https://rm1:8088/ws"));
    }

    #[test]
    fn test_values_containing_tokens_are_not_expanded() {
        let values: HashMap<String, String> = [("HOST", "{PORT}"), ("PORT", "8088"), ("PATH", "a{HOST}")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for _ in 0..16 {
            assert_eq!(
                substitute("http://{HOST}:{PORT}/{PATH}", &values),
                "http://{PORT}:8088/a{HOST}"
            );
        }
    }
}
