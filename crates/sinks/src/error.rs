//! Common sink error type

use thiserror::Error;

use crate::slack::builder::BuildError;

/// Errors from constructing or invoking sinks
#[derive(Debug, Error)]
pub enum SinkError {
    /// A required property is absent from the output configuration
    #[error("{component}: '{property}' is required")]
    MissingProperty {
        /// Which sink type complained
        component: &'static str,
        /// The missing property key
        property: &'static str,
    },

    /// A property is present but unusable
    #[error("{component}: invalid '{property}': {message}")]
    InvalidProperty {
        /// Which sink type complained
        component: &'static str,
        /// The offending property key
        property: &'static str,
        /// Why it is invalid
        message: String,
    },

    /// The configuration names a type the registry cannot build
    #[error("unsupported output type '{0}'")]
    UnsupportedType(String),

    /// A dispatch asked for an output id that is not registered
    #[error("output '{0}' not found")]
    UnknownOutput(String),

    /// JSON encoding of the event failed
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    /// An HTTP request could not be sent
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The destination answered with a non-success status
    #[error("{url} returned status {status}")]
    Status {
        /// Destination URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Writing to a local destination failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// AMQP connection or publish failure
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    /// The child process exited nonzero
    #[error("command failed with {status}: {stderr}")]
    CommandFailed {
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The child process ran past its deadline
    #[error("command timed out after {seconds}s")]
    CommandTimeout {
        /// Configured timeout
        seconds: u64,
    },

    /// The Block Kit builder rejected the configured blocks
    #[error("failed to build message: {0}")]
    Build(#[from] BuildError),

    /// The retry wrapper exhausted its attempts
    #[error("failed to send event after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Last underlying failure
        last_error: String,
    },
}

impl SinkError {
    /// Create a MissingProperty error
    pub fn missing(component: &'static str, property: &'static str) -> Self {
        Self::MissingProperty {
            component,
            property,
        }
    }

    /// Create an InvalidProperty error
    pub fn invalid(
        component: &'static str,
        property: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            component,
            property,
            message: message.into(),
        }
    }
}
