//! End-to-end service tests
//!
//! These exercise the service manager against real config files and real
//! sockets: counting HTTP sinks stand in for downstream destinations, and a
//! minimal fake Nomad API serves the stream and versions endpoints.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use nev_event::Event;
use nev_nomad::{Client, EventStream};
use nomad_events::service::ServiceManager;

/// HTTP server answering 200 to every request, counting what it saw
struct CountingServer {
    url: String,
    hits: Arc<AtomicUsize>,
}

impl CountingServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/events", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = [0u8; 8192];
                    // One request per connection is enough for these tests
                    let _ = socket.read(&mut buf).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        )
                        .await;
                });
            }
        });

        Self { url, hits }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn wait_for(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached within deadline");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn node_event(index: u64) -> Event {
    Event::new("Node", "NodeRegistration", index)
}

fn job_registered(index: u64) -> Event {
    Event {
        payload: serde_json::json!({"Job": {"ID": "web", "Version": 2}}),
        ..Event::new("Job", "JobRegistered", index)
    }
}

#[tokio::test]
async fn catch_all_routes_every_event_to_one_sink() {
    let config = write_config(
        r#"
nomad:
  address: http://localhost:4646
outputs:
  s:
    type: stdout
routes:
  - filter: ""
    output: s
"#,
    );
    let service = ServiceManager::new(config.path(), None).unwrap();

    let event = Event::new("Node", "X", 1);
    assert_eq!(service.route(&event), vec!["s"]);
    service.send("s", &event).await.unwrap();
}

#[tokio::test]
async fn hierarchical_continue_false_suppresses_catch_all() {
    let config = write_config(
        r#"
nomad:
  address: http://localhost:4646
outputs:
  n:
    type: stdout
  r:
    type: stdout
  j:
    type: stdout
  all:
    type: stdout
routes:
  - filter: "event.Topic == 'Node'"
    output: n
    routes:
      - filter: "event.Type == 'NodeRegistration'"
        output: r
  - filter: "event.Topic == 'Job'"
    continue: false
    routes:
      - filter: "event.Type == 'JobRegistered'"
        output: j
  - filter: ""
    output: all
"#,
    );
    let service = ServiceManager::new(config.path(), None).unwrap();

    assert_eq!(service.route(&job_registered(2)), vec!["j"]);
    assert_eq!(service.route(&node_event(3)), vec!["n", "r", "all"]);
}

#[tokio::test]
async fn startup_rejects_invalid_configuration() {
    let config = write_config(
        r#"
nomad:
  address: http://localhost:4646
outputs:
  s:
    type: stdout
routes:
  - filter: ""
    output: missing
"#,
    );
    assert!(ServiceManager::new(config.path(), None).is_err());
}

#[tokio::test]
async fn failed_reload_keeps_previous_configuration() {
    let config = write_config(
        r#"
nomad:
  address: http://localhost:4646
outputs:
  s:
    type: stdout
routes:
  - output: s
"#,
    );
    let service = ServiceManager::new(config.path(), None).unwrap();

    // Break the file on disk, then attempt a reload
    std::fs::write(config.path(), "routes: [not: valid").unwrap();
    assert!(service.reload().is_err());

    // The previous generation still routes
    assert_eq!(service.route(&node_event(1)), vec!["s"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn reload_under_load_switches_sink_generations() {
    let sink_a = CountingServer::start().await;
    let sink_b = CountingServer::start().await;

    let config_a = format!(
        r#"
nomad:
  address: http://localhost:4646
outputs:
  a:
    type: http
    url: {}
  b:
    type: http
    url: {}
routes:
  - filter: ""
    output: a
"#,
        sink_a.url, sink_b.url
    );
    let config_b = config_a.replace("output: a", "output: b");

    let config = write_config(&config_a);
    let service = Arc::new(ServiceManager::new(config.path(), None).unwrap());

    let (tx, rx) = mpsc::channel(nomad_events::EVENT_BUFFER_SIZE);
    let dispatcher = tokio::spawn(nomad_events::dispatch::run(rx, Arc::clone(&service)));

    tx.send(node_event(1)).await.unwrap();
    wait_for(|| sink_a.hits() == 1).await;
    assert_eq!(sink_b.hits(), 0);

    // Swap generations while the dispatcher is live
    std::fs::write(config.path(), &config_b).unwrap();
    service.reload().unwrap();

    for index in 2..=4 {
        tx.send(node_event(index)).await.unwrap();
    }
    wait_for(|| sink_b.hits() == 3).await;

    // Nothing after the reload reached the old sink
    assert_eq!(sink_a.hits(), 1);

    drop(tx);
    dispatcher.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_sink_never_blocks_the_healthy_one() {
    let healthy = CountingServer::start().await;

    let config = write_config(&format!(
        r#"
nomad:
  address: http://localhost:4646
outputs:
  broken:
    type: http
    url: http://127.0.0.1:1/unreachable
  healthy:
    type: http
    url: {}
routes:
  - filter: ""
    output: broken
  - filter: ""
    output: healthy
"#,
        healthy.url
    ));
    let service = Arc::new(ServiceManager::new(config.path(), None).unwrap());

    let (tx, rx) = mpsc::channel(8);
    let dispatcher = tokio::spawn(nomad_events::dispatch::run(rx, Arc::clone(&service)));

    tx.send(node_event(1)).await.unwrap();
    wait_for(|| healthy.hits() == 1).await;

    drop(tx);
    dispatcher.await.unwrap();
}

/// Minimal fake Nomad API: one stream frame, then a failing versions call
async fn fake_nomad(frame: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let frame = frame.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();

                if request.starts_with("GET /v1/event/stream") {
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\nconnection: close\r\n\r\n{frame}\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    // Hold the stream open briefly so the body is not
                    // truncated mid-frame
                    tokio::time::sleep(Duration::from_millis(500)).await;
                } else {
                    // Any other endpoint (job versions) fails
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        )
                        .await;
                }
            });
        }
    });

    address
}

#[tokio::test(flavor = "multi_thread")]
async fn enricher_failure_still_delivers_the_event() {
    let frame = serde_json::json!({
        "Index": 7,
        "Events": [{
            "Topic": "Job",
            "Type": "JobRegistered",
            "Key": "web",
            "Index": 7,
            "Payload": {"Job": {"ID": "web", "Version": 2}}
        }]
    })
    .to_string();
    let address = fake_nomad(frame).await;

    let client = Arc::new(
        Client::new(&nev_config::NomadConfig {
            address,
            ..nev_config::NomadConfig::default()
        })
        .unwrap(),
    );

    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(8);
    let consumer = tokio::spawn(EventStream::new(client).run(cancel.clone(), tx));

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event within deadline")
        .expect("channel closed");

    assert_eq!(event.topic, "Job");
    assert_eq!(event.event_type, "JobRegistered");
    assert_eq!(event.index, 7);
    // The versions endpoint answered 500, so the event ships without a diff
    assert!(event.diff.is_none());

    cancel.cancel();
    consumer.await.unwrap();
}
