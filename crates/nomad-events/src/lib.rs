//! nomad-events runtime
//!
//! The pieces the binary wires together: the [`service::ServiceManager`]
//! holding the hot-swappable router and sink registry, and the
//! [`dispatch`] loop draining the event channel through them.

pub mod dispatch;
pub mod service;

/// Capacity of the ingest → dispatcher event channel
///
/// The consumer blocks when the channel fills (backpressure); the upstream
/// API resumes by index, so blocking is always safe and dropping never is.
pub const EVENT_BUFFER_SIZE: usize = 100;
