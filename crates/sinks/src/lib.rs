//! Output sinks
//!
//! Every destination implements the same narrow contract: take one event,
//! deliver it, report an error. The registry constructs sinks from
//! configuration and owns them for the lifetime of one configuration
//! generation; hot reload builds a fresh registry.
//!
//! # Available sinks
//!
//! | Sink | Destination |
//! |------|-------------|
//! | `stdout` | One JSON line or rendered text per event |
//! | `http` | Configurable method + headers, JSON body |
//! | `slack` | Incoming webhook with Block Kit messages |
//! | `rabbitmq` | AMQP topic exchange, templated routing key |
//! | `exec` | Child process, JSON event on stdin |
//!
//! A sink with a `retry` block is wrapped in [`RetrySink`], which backs off
//! exponentially between attempts. Failures never propagate past the
//! dispatcher: a permanently failing sink is logged and the rest keep
//! working.

/// Stdout sink - JSON lines or rendered text
pub mod stdout;

/// HTTP sink - configurable request with JSON body
pub mod http;

/// Exec sink - child process fed via stdin
pub mod exec;

/// RabbitMQ sink - AMQP topic publisher
pub mod rabbitmq;

/// Slack sink - webhook with Block Kit builder
pub mod slack;

mod enrich;
mod error;
mod registry;
mod retry;

use async_trait::async_trait;

use nev_event::Event;

pub use enrich::NomadEnricher;
pub use error::SinkError;
pub use registry::Registry;
pub use retry::RetrySink;
pub use slack::builder::BuildError;

/// The delivery contract every sink implements
///
/// `send` is invoked once per routed event, sequentially per dispatcher.
/// Implementations must be safe to share across reload generations that
/// briefly overlap.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one event
    async fn send(&self, event: &Event) -> Result<(), SinkError>;
}
