//! The dispatcher loop
//!
//! Consumes the event channel and, per event, routes then delivers to each
//! matched output *sequentially in the order routed*. Sequential dispatch
//! keeps per-sink failure isolation obvious, bounds fan-out, and preserves
//! receipt order within any single sink.
//!
//! Nothing a sink does stops the loop: a delivery failure is logged with
//! the output id and the event coordinates, and the remaining outputs for
//! the same event still get their turn.

use std::sync::Arc;

use tokio::sync::mpsc;

use nev_event::Event;

use crate::service::ServiceManager;

/// Run until the event channel closes, then drain and return
///
/// Shutdown needs no separate signal here: cancelling the ingest consumer
/// drops the sender, the channel drains, and this loop ends on its own.
pub async fn run(mut events: mpsc::Receiver<Event>, service: Arc<ServiceManager>) {
    let mut processed: u64 = 0;

    while let Some(event) = events.recv().await {
        processed += 1;

        tracing::debug!(
            topic = %event.topic,
            event_type = %event.event_type,
            key = %event.key,
            index = event.index,
            "processing event"
        );

        let outputs = service.route(&event);
        if outputs.is_empty() {
            continue;
        }

        tracing::debug!(
            topic = %event.topic,
            event_type = %event.event_type,
            outputs = ?outputs,
            "event routed"
        );

        for output in &outputs {
            if let Err(error) = service.send(output, &event).await {
                tracing::error!(
                    output = %output,
                    topic = %event.topic,
                    event_type = %event.event_type,
                    key = %event.key,
                    error = %error,
                    "failed to send event to output"
                );
            }
        }
    }

    tracing::debug!(events_processed = processed, "dispatcher stopped");
}
