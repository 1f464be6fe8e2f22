//! REST client configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid REST configuration or client construction failure.
#[derive(Debug, Error)]
pub enum RestConfigError {
    /// The base URL is missing or not an http(s) URL.
    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

/// Connection timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    30
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl ConnectionSettings {
    /// Get the connection timeout as a Duration.
    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the read timeout as a Duration.
    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.read_timeout_secs)
    }
}

/// TLS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify_certificate: true,
        }
    }
}

impl TlsConfig {
    /// Log a security warning when certificate verification is disabled.
    ///
    /// Call after deserializing from an external source.
    pub fn validate_security(&self) {
        if !self.verify_certificate {
            tracing::warn!(
                target: "security",
                "TLS certificate verification is DISABLED; connections are \
                 vulnerable to man-in-the-middle attacks. Only use this for \
                 local development."
            );
        }
    }
}

/// Configuration for the REST control-plane client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    /// Base URL of the control plane, e.g. `https://api.nerio.example`.
    pub base_url: String,

    /// Connection timing settings.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// TLS settings.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Extra headers sent with every request.
    #[serde(default)]
    pub default_headers: Vec<(String, String)>,
}

impl RestConfig {
    /// Create a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connection: ConnectionSettings::default(),
            tls: TlsConfig::default(),
            default_headers: Vec::new(),
        }
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Replace the connection settings.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), RestConfigError> {
        let parsed =
            url::Url::parse(&self.base_url).map_err(|e| RestConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                message: e.to_string(),
            })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RestConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        self.tls.validate_security();
        Ok(())
    }

    /// A copy safe for logging: header values are masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        for (_, value) in &mut redacted.default_headers {
            *value = "***".to_string();
        }
        redacted
    }
}
