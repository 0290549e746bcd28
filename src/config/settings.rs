//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity and widget origin.
    #[serde(default)]
    pub server: ServerConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let domain = &self.server.domain;
        if !(domain.starts_with("http://") || domain.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                message: format!("Invalid server domain '{domain}'. Must start with http:// or https://"),
            });
        }

        let endpoint = &self.http.endpoint_path;
        if !endpoint.starts_with('/') || endpoint.len() < 2 || endpoint.starts_with("/widgets") {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid endpoint path '{endpoint}'. Must start with '/' and not be '/' or under '/widgets'"
                ),
            });
        }

        self.http.socket_addr()?;

        if self.server.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Server name must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Server identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Name reported by `initialize`.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Version reported by `initialize`.
    #[serde(default = "default_server_version")]
    pub version: String,

    /// Public origin serving widget bundles, e.g. `https://app.example.com`.
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            domain: default_domain(),
        }
    }
}

fn default_server_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_domain() -> String {
    "http://localhost:3000".to_string()
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Path of the JSON-RPC endpoint.
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Directory of compiled widget bundles, served under `/widgets`.
    #[serde(default)]
    pub widgets_dir: Option<PathBuf>,
}

impl HttpConfig {
    /// Parses [`Self::bind_address`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if the address is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|_| ConfigError::ValidationError {
                message: format!(
                    "Invalid bind address '{}'. Expected IP:PORT",
                    self.bind_address
                ),
            })
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            endpoint_path: default_endpoint_path(),
            widgets_dir: None,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_endpoint_path() -> String {
    "/mcp".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
