//! Error types for topology discovery

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("No credentials for manager at {address}: {reason}")]
    MissingCredentials { address: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    #[error("Mapping document error in {source_name}: {message}")]
    Mapping { source_name: String, message: String },

    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML rendering error: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Classify a client error for the request that produced it
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Connection {
                url,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                url,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::MalformedResponse {
                url,
                message: err.to_string(),
            }
        } else {
            Self::Request {
                url,
                message: err.to_string(),
            }
        }
    }

    /// Timeouts and connection failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection { .. })
    }

    /// The URL of the failing remote call, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Timeout { url }
            | Self::Connection { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Request { url, .. }
            | Self::MalformedResponse { url, .. } => Some(url),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let timeout = DiscoveryError::Timeout {
            url: "http://m/api".to_string(),
        };
        let refused = DiscoveryError::Connection {
            url: "http://m/api".to_string(),
            message: "refused".to_string(),
        };
        let forbidden = DiscoveryError::HttpStatus {
            url: "http://m/api".to_string(),
            status: 403,
        };

        assert!(timeout.is_transient());
        assert!(refused.is_transient());
        assert!(!forbidden.is_transient());
        assert!(!DiscoveryError::config("no address").is_transient());
        assert_eq!(forbidden.url(), Some("http://m/api"));
    }
}
