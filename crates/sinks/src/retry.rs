//! Retry decorator for sinks
//!
//! Wraps any sink with bounded retries and exponential backoff. The wrapper
//! is transparent: success on any attempt is success, and exhaustion returns
//! a single error naming the attempt count and the last failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use nev_event::Event;

use crate::{Sink, SinkError};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// A sink wrapped with retry-on-failure behavior
pub struct RetrySink {
    inner: Arc<dyn Sink>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetrySink {
    /// Wrap a sink with the given policy
    ///
    /// A zero `max_retries` or `base_delay` falls back to the defaults
    /// (3 attempts, 1s base).
    pub fn new(inner: Arc<dyn Sink>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries: if max_retries == 0 {
                DEFAULT_MAX_RETRIES
            } else {
                max_retries
            },
            base_delay: if base_delay.is_zero() {
                DEFAULT_BASE_DELAY
            } else {
                base_delay
            },
        }
    }

    /// Delay before the attempt following `attempt` failures
    fn delay_for(&self, attempt: u32) -> Duration {
        // 1s, 2s, 4s, 8s, ...
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

#[async_trait]
impl Sink for RetrySink {
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.inner.send(event).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!(
                            topic = %event.topic,
                            event_type = %event.event_type,
                            attempt,
                            "event sent after retry"
                        );
                    }
                    return Ok(());
                }
                Err(error) => {
                    last_error = error.to_string();
                    if attempt < self.max_retries {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            topic = %event.topic,
                            event_type = %event.event_type,
                            attempt,
                            max_retries = self.max_retries,
                            error = %error,
                            retry_delay_ms = delay.as_millis() as u64,
                            "send failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(SinkError::RetriesExhausted {
            attempts: self.max_retries,
            last_error,
        })
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;
