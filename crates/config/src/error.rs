//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The Nomad address is missing
    #[error("nomad.address is required")]
    MissingAddress,

    /// An output is missing its type or uses an unknown one
    #[error("output '{output}' has unsupported type '{output_type}'")]
    UnknownOutputType {
        /// Output id
        output: String,
        /// The offending type string
        output_type: String,
    },

    /// A route references an output id that is not declared
    #[error("route references unknown output '{output}'")]
    UnknownOutput {
        /// Name of the missing output
        output: String,
    },

    /// A route node has neither an output nor children
    #[error("route '{route}' must have either an output or child routes")]
    EmptyRoute {
        /// Human-readable position of the node, e.g. "routes[1].routes[0]"
        route: String,
    },

    /// TLS client cert and key must be configured together
    #[error("tls client_cert and client_key must both be set or both be unset")]
    PartialClientCert,

    /// A configured certificate file does not exist
    #[error("tls {field} file '{path}' does not exist")]
    MissingCertFile {
        /// Which TLS field named the file
        field: &'static str,
        /// The configured path
        path: String,
    },

    /// A retry delay string does not parse
    #[error("output '{output}' has invalid base_delay '{value}': {message}")]
    InvalidDelay {
        /// Output id
        output: String,
        /// The offending duration string
        value: String,
        /// Why it failed
        message: String,
    },
}
