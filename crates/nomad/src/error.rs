//! Client and stream error types

use thiserror::Error;

/// Errors from the Nomad API client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured address is not a valid URL
    #[error("invalid nomad address '{address}': {message}")]
    InvalidAddress {
        /// The configured address
        address: String,
        /// Why it failed to parse
        message: String,
    },

    /// The configured ACL token is not a valid header value
    #[error("invalid nomad token: {message}")]
    InvalidToken {
        /// Why it failed
        message: String,
    },

    /// TLS material could not be read or parsed
    #[error("failed to load tls material from '{path}': {message}")]
    Tls {
        /// The file involved
        path: String,
        /// Why it failed
        message: String,
    },

    /// The server-name override could not be resolved against the address
    #[error("failed to resolve '{host}' for server_name override: {message}")]
    Resolve {
        /// The address host being resolved
        host: String,
        /// Why it failed
        message: String,
    },

    /// The underlying HTTP client failed
    #[error("nomad request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("nomad api returned status {status} for {path}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Request path
        path: String,
    },

    /// The response body was not the JSON shape we expected
    #[error("unexpected response from {path}: {message}")]
    Decode {
        /// Request path
        path: String,
        /// What went wrong
        message: String,
    },
}

/// Errors from the event-stream consumer
#[derive(Debug, Error)]
pub enum StreamError {
    /// Establishing the streaming request failed
    #[error("event stream handshake failed: {0}")]
    Handshake(#[source] ClientError),

    /// The established stream failed mid-flight
    #[error("event stream transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// A stream frame was not valid JSON
    #[error("malformed stream frame: {0}")]
    Frame(String),

    /// The server closed the stream
    #[error("event stream closed by server")]
    Closed,

    /// The downstream event channel is gone; the process is shutting down
    #[error("event channel closed")]
    ChannelClosed,

    /// The inner retry loop gave up on this connection
    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetries {
        /// How many attempts were made
        attempts: u32,
        /// The last underlying error
        last_error: String,
    },

    /// Cooperative shutdown
    #[error("cancelled")]
    Cancelled,
}

impl StreamError {
    /// Whether this error means "stop the consumer" rather than "reconnect"
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::ChannelClosed)
    }
}
