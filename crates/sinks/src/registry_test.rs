//! Registry tests

use super::*;

use std::collections::BTreeMap;
use std::str::FromStr;

use nev_config::Config;

fn outputs(yaml: &str) -> BTreeMap<String, nev_config::OutputConfig> {
    let full = format!(
        "nomad:\n  address: http://localhost:4646\noutputs:\n{yaml}routes:\n  - output: console\n"
    );
    Config::from_str(&full).unwrap().outputs
}

#[test]
fn builds_every_configured_type() {
    let outputs = outputs(
        r#"  console:
    type: stdout
  hook:
    type: http
    url: http://example.com/events
  chat:
    type: slack
    webhook_url: https://hooks.example.com/x
  bus:
    type: rabbitmq
    url: amqp://localhost:5672/
  script:
    type: exec
    command: cat
"#,
    );
    let registry = Registry::build(&outputs, None).unwrap();

    assert_eq!(registry.len(), 5);
    for id in ["console", "hook", "chat", "bus", "script"] {
        assert!(registry.contains(id), "missing: {id}");
    }
}

#[test]
fn retry_block_wraps_the_sink() {
    let outputs = outputs(
        r#"  console:
    type: stdout
    retry:
      max_retries: 5
      base_delay: 100ms
"#,
    );
    // Construction succeeding is the observable here; retry behavior itself
    // is covered by the retry wrapper tests.
    let registry = Registry::build(&outputs, None).unwrap();
    assert!(registry.contains("console"));
}

#[test]
fn bad_properties_fail_the_build() {
    let outputs = outputs(
        r#"  console:
    type: stdout
  hook:
    type: http
"#,
    );
    let error = Registry::build(&outputs, None).unwrap_err();
    assert!(error.to_string().contains("url"));
}

#[tokio::test]
async fn unknown_output_id_is_an_error() {
    let outputs = outputs("  console:\n    type: stdout\n");
    let registry = Registry::build(&outputs, None).unwrap();

    let event = nev_event::Event::new("Node", "X", 1);
    let error = registry.send("nope", &event).await.unwrap_err();
    assert!(matches!(error, SinkError::UnknownOutput(id) if id == "nope"));
}
