//! Nomad API client and event-stream consumer
//!
//! Two halves:
//!
//! - [`Client`] is a thin HTTP client over the Nomad API: the long-poll event
//!   stream endpoint, the job-versions endpoint used for diff enrichment, and
//!   the lookup endpoints backing template enrichment functions.
//! - [`EventStream`] is the reconnecting consumer. It keeps one long-lived
//!   streaming request open, checkpoints the highest delivered index, and
//!   resumes from it across transient disconnects with exponential backoff.
//!
//! The consumer is not hot-reloadable: address or token changes require a
//! process restart.

mod client;
mod error;
mod stream;

pub use client::Client;
pub use error::{ClientError, StreamError};
pub use stream::EventStream;
