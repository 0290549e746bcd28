//! Error types for widget-mcp.
//!
//! Protocol-level failures live in [`crate::mcp::error`]; this module covers
//! startup and serving.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::mcp::schema::SchemaError;

/// Errors that can occur while loading configuration or building a server.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },

    /// A registered capability has a schema that cannot be advertised.
    #[error("{kind} '{name}' has an invalid schema: {source}")]
    InvalidCapability {
        /// `tool` or `prompt`.
        kind: &'static str,
        /// Registry name.
        name: String,
        /// What was wrong with the schema.
        #[source]
        source: SchemaError,
    },
}

/// Errors that can occur while serving.
#[derive(Error, Debug)]
pub enum ServeError {
    /// The listening socket could not be bound.
    #[error("failed to bind {address}")]
    Bind {
        /// Requested address.
        address: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Transport I/O failed while serving.
    #[error("transport I/O failed")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn invalid_capability_names_the_culprit() {
        let error = ConfigError::InvalidCapability {
            kind: "tool",
            name: "greet".to_string(),
            source: SchemaError::UntypedProperty {
                name: "who".to_string(),
            },
        };
        let msg = error.to_string();
        assert!(msg.starts_with("tool 'greet'"));
        assert!(msg.contains("who"));
    }

    #[test]
    fn bind_error_names_address() {
        let error = ServeError::Bind {
            address: "127.0.0.1:3000".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(error.to_string().contains("127.0.0.1:3000"));
    }
}
