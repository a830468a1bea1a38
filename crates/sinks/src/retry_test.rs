//! Retry wrapper tests

use super::*;

use std::sync::atomic::{AtomicU32, Ordering};

/// Sink that fails a fixed number of times before succeeding
struct FlakySink {
    calls: AtomicU32,
    failures: u32,
}

impl FlakySink {
    fn new(failures: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for FlakySink {
    async fn send(&self, _event: &Event) -> Result<(), SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(SinkError::Status {
                url: "http://example.com".into(),
                status: 500,
            })
        } else {
            Ok(())
        }
    }
}

fn event() -> Event {
    Event::new("Node", "NodeRegistration", 1)
}

#[tokio::test]
async fn succeeding_sink_is_invoked_exactly_once() {
    let inner = Arc::new(FlakySink::new(0));
    let retry = RetrySink::new(inner.clone(), 3, Duration::from_millis(1));

    retry.send(&event()).await.unwrap();
    assert_eq!(inner.calls(), 1);
}

#[tokio::test]
async fn failing_k_times_yields_k_plus_one_invocations() {
    let inner = Arc::new(FlakySink::new(2));
    let retry = RetrySink::new(inner.clone(), 5, Duration::from_millis(1));

    retry.send(&event()).await.unwrap();
    assert_eq!(inner.calls(), 3);
}

#[tokio::test]
async fn exhaustion_names_attempts_and_last_error() {
    let inner = Arc::new(FlakySink::new(u32::MAX));
    let retry = RetrySink::new(inner.clone(), 3, Duration::from_millis(1));

    let error = retry.send(&event()).await.unwrap_err();
    assert_eq!(inner.calls(), 3);

    let message = error.to_string();
    assert!(message.contains("3 attempts"), "message: {message}");
    assert!(message.contains("500"), "message: {message}");
}

#[tokio::test]
async fn zero_config_uses_defaults() {
    let retry = RetrySink::new(Arc::new(FlakySink::new(0)), 0, Duration::ZERO);
    assert_eq!(retry.max_retries, 3);
    assert_eq!(retry.base_delay, Duration::from_secs(1));
}

#[test]
fn delay_doubles_per_attempt() {
    let retry = RetrySink::new(
        Arc::new(FlakySink::new(0)),
        5,
        Duration::from_millis(100),
    );
    assert_eq!(retry.delay_for(1), Duration::from_millis(100));
    assert_eq!(retry.delay_for(2), Duration::from_millis(200));
    assert_eq!(retry.delay_for(3), Duration::from_millis(400));
    assert_eq!(retry.delay_for(4), Duration::from_millis(800));
}
