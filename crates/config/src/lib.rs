//! nomad-events configuration
//!
//! YAML-based configuration loading with validation at load time. A minimal
//! config names the Nomad address, one output, and one route:
//!
//! ```yaml
//! nomad:
//!   address: http://localhost:4646
//!
//! outputs:
//!   console:
//!     type: stdout
//!
//! routes:
//!   - filter: ""
//!     output: console
//! ```
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use nev_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "nomad:\n  address: http://localhost:4646\noutputs:\n  out:\n    type: stdout\nroutes:\n  - output: out\n",
//! ).unwrap();
//! assert_eq!(config.routes.len(), 1);
//! ```

mod error;
mod nomad;
mod outputs;
mod routes;
mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use nomad::{NomadConfig, TlsConfig};
pub use outputs::{parse_duration, OutputConfig, RetryConfig, KNOWN_OUTPUT_TYPES};
pub use routes::RouteConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Nomad API connection settings
    pub nomad: NomadConfig,

    /// Output destinations, keyed by the id routes reference
    pub outputs: BTreeMap<String, OutputConfig>,

    /// Hierarchical routing rules, evaluated in declaration order
    pub routes: Vec<RouteConfig>,
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid YAML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks that the Nomad address is set, every output has a known type,
    /// every route node has an output or children, referenced output ids
    /// exist, and TLS material is consistent.
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
