//! Reconnecting event-stream consumer
//!
//! # Design
//!
//! Two nested loops with different jobs:
//!
//! - The **outer loop** keeps the process alive indefinitely: whenever the
//!   inner loop gives up it waits one more backoff interval and starts over
//!   (which also re-resolves the endpoint).
//! - The **inner loop** gives up on a persistently broken connection after a
//!   bounded number of attempts (`max_retries`, default 10), backing off
//!   exponentially between attempts.
//!
//! The backoff delay starts at 1s, doubles per consecutive failure, caps at
//! 60s, and resets to base once a connection is established. The stream
//! resumes from `last_index`, which is advanced only after an event has been
//! delivered into the channel: a full channel blocks the consumer
//! (backpressure) rather than dropping events.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use nev_event::{value, Event};

use crate::error::StreamError;
use crate::Client;

const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const DEFAULT_MAX_RETRIES: u32 = 10;

/// One frame from the event stream endpoint
///
/// Heartbeats arrive as empty objects and deserialize to a frame with no
/// events.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(rename = "Events", default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "Topic", default)]
    topic: String,
    #[serde(rename = "Type", default)]
    event_type: String,
    #[serde(rename = "Key", default)]
    key: String,
    #[serde(rename = "Namespace", default)]
    namespace: String,
    #[serde(rename = "Index", default)]
    index: u64,
    #[serde(rename = "Payload", default)]
    payload: Value,
}

/// The reconnecting event-stream consumer
pub struct EventStream {
    client: Arc<Client>,
    last_index: u64,
    backoff: Duration,
    max_retries: u32,
}

impl EventStream {
    /// Create a consumer starting from the current cluster index
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            last_index: 0,
            backoff: BASE_BACKOFF,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the bounded retry count of the inner loop
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Run until cancelled, producing events onto `tx` in arrival order
    ///
    /// Never returns an error to the caller: transient failures reconnect,
    /// and only cancellation or a closed channel end the loop.
    pub async fn run(mut self, cancel: CancellationToken, tx: mpsc::Sender<Event>) {
        tracing::info!("event stream consumer starting");

        loop {
            match self.stream_with_retry(&cancel, &tx).await {
                Err(error) if error.is_terminal() => break,
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        backoff_secs = self.backoff.as_secs(),
                        last_index = self.last_index,
                        "stream ended, restarting after backoff"
                    );
                    if !self.wait_backoff(&cancel).await {
                        break;
                    }
                }
                Ok(()) => break,
            }
        }

        tracing::info!(last_index = self.last_index, "event stream consumer stopped");
    }

    /// Inner retry loop: bounded attempts against one endpoint resolution
    async fn stream_with_retry(
        &mut self,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<Event>,
    ) -> Result<(), StreamError> {
        let mut retries = 0;
        loop {
            let error = match self.connect_and_stream(cancel, tx).await {
                Err(error) if error.is_terminal() => return Err(error),
                Err(error) => error,
                Ok(()) => return Ok(()),
            };

            retries += 1;
            if retries >= self.max_retries {
                return Err(StreamError::MaxRetries {
                    attempts: retries,
                    last_error: error.to_string(),
                });
            }

            tracing::warn!(
                error = %error,
                attempt = retries,
                max_retries = self.max_retries,
                "connection failed, retrying"
            );

            if !self.wait_backoff(cancel).await {
                return Err(StreamError::Cancelled);
            }
        }
    }

    /// One connection: handshake, then frames until something breaks
    async fn connect_and_stream(
        &mut self,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<Event>,
    ) -> Result<(), StreamError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            result = self.client.stream_events(self.last_index) => {
                result.map_err(StreamError::Handshake)?
            }
        };

        tracing::debug!(last_index = self.last_index, "event stream connected");
        // A healthy connection resets the backoff clock
        self.backoff = BASE_BACKOFF;

        let mut body = response.bytes_stream();
        let mut buffer = BytesMut::new();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(StreamError::Cancelled),
                chunk = body.next() => chunk,
            };

            let chunk = match chunk {
                Some(Ok(chunk)) => chunk,
                Some(Err(error)) => return Err(StreamError::Transport(error)),
                None => return Err(StreamError::Closed),
            };

            buffer.extend_from_slice(&chunk);
            while let Some(line) = take_line(&mut buffer) {
                let frame = decode_frame(&line)?;
                let Some(frame) = frame else {
                    continue; // heartbeat
                };
                for raw in frame.events {
                    self.deliver(raw, cancel, tx).await?;
                }
            }
        }
    }

    /// Enrich (when applicable) and push one event, then checkpoint
    async fn deliver(
        &mut self,
        raw: RawEvent,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<Event>,
    ) -> Result<(), StreamError> {
        let index = raw.index;
        let mut event = Event {
            topic: raw.topic,
            event_type: raw.event_type,
            key: raw.key,
            namespace: raw.namespace,
            index: raw.index,
            payload: raw.payload,
            diff: None,
        };

        if let Some(job_id) = diff_candidate(&event) {
            match self.client.job_diff(&job_id).await {
                Ok(diff) => event.diff = Some(diff),
                Err(error) => {
                    // The event still goes out, just without a diff
                    tracing::warn!(
                        job_id = %job_id,
                        error = %error,
                        "failed to fetch job diff"
                    );
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            sent = tx.send(event) => {
                sent.map_err(|_| StreamError::ChannelClosed)?;
            }
        }

        // Checkpoint only what was actually delivered
        self.last_index = index;
        Ok(())
    }

    /// Sleep the current backoff then double it; false means cancelled
    async fn wait_backoff(&mut self, cancel: &CancellationToken) -> bool {
        let waited = tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.backoff) => true,
        };
        if waited {
            self.backoff = (self.backoff * 2).min(MAX_BACKOFF);
        }
        waited
    }
}

/// Split one newline-terminated line off the front of the buffer
fn take_line(buffer: &mut BytesMut) -> Option<Vec<u8>> {
    let newline = buffer.iter().position(|&b| b == b'\n')?;
    let line = buffer.split_to(newline).to_vec();
    buffer.advance(1);
    Some(line)
}

/// Decode a frame line; blank lines and heartbeats yield None
fn decode_frame(line: &[u8]) -> Result<Option<StreamFrame>, StreamError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| StreamError::Frame(e.to_string()))?
        .trim();
    if text.is_empty() {
        return Ok(None);
    }

    let frame: StreamFrame =
        serde_json::from_str(text).map_err(|e| StreamError::Frame(e.to_string()))?;
    if frame.events.is_empty() {
        return Ok(None);
    }
    Ok(Some(frame))
}

/// Job id to fetch a diff for, when this event qualifies
///
/// Only `Job/JobRegistered` events whose job version is greater than 1 have
/// a prior version to diff against.
fn diff_candidate(event: &Event) -> Option<String> {
    if event.topic != "Job" || event.event_type != "JobRegistered" {
        return None;
    }
    let job = value::lookup(&event.payload, "Job")?;
    let version = value::lookup(job, "Version")?.as_f64()?;
    if version <= 1.0 {
        return None;
    }
    Some(value::lookup(job, "ID")?.as_str()?.to_string())
}
