//! Nomad API connection settings

use serde::Deserialize;

/// Connection settings for the Nomad API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NomadConfig {
    /// Base address of the Nomad API, e.g. `http://localhost:4646`
    pub address: String,

    /// ACL token sent as `X-Nomad-Token`; empty means no token
    pub token: String,

    /// Optional TLS material for HTTPS clusters
    pub tls: Option<TlsConfig>,
}

/// TLS settings for the Nomad client
///
/// `client_cert` and `client_key` must be configured together; all file
/// paths are checked for existence at load time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Master switch; when false the rest of the section is ignored
    pub enabled: bool,

    /// PEM-encoded CA certificate to trust
    pub ca_cert: Option<String>,

    /// PEM-encoded client certificate for mutual TLS
    pub client_cert: Option<String>,

    /// PEM-encoded client key for mutual TLS
    pub client_key: Option<String>,

    /// Expected server name, when it differs from the address host
    pub server_name: Option<String>,

    /// Skip server certificate verification
    pub insecure_skip_verify: bool,
}
