//! Exec sink tests

use super::*;

use serde_json::json;

fn properties(yaml: &str) -> Map<String, Value> {
    let value: Value = serde_yaml::from_str(yaml).unwrap();
    value.as_object().cloned().unwrap_or_default()
}

fn event() -> Event {
    Event {
        payload: json!({"Job": {"ID": "web"}}),
        ..Event::new("Job", "JobRegistered", 5)
    }
}

#[test]
fn command_is_required() {
    let err = ExecSink::from_properties(&Map::new()).unwrap_err();
    assert!(err.to_string().contains("command"));
}

#[test]
fn string_command_is_whitespace_split() {
    let props = properties("command: \"cat -\"");
    let sink = ExecSink::from_properties(&props).unwrap();
    assert_eq!(sink.command, vec!["cat", "-"]);
}

#[test]
fn list_command_is_taken_verbatim() {
    let props = properties("command: [\"/bin/sh\", \"-c\", \"exit 0\"]");
    let sink = ExecSink::from_properties(&props).unwrap();
    assert_eq!(sink.command.len(), 3);
    assert_eq!(sink.command[2], "exit 0");
}

#[test]
fn rejects_non_string_arguments() {
    let props = properties("command: [\"echo\", 3]");
    assert!(ExecSink::from_properties(&props).is_err());
}

#[test]
fn timeout_defaults_to_thirty_seconds() {
    let props = properties("command: cat");
    let sink = ExecSink::from_properties(&props).unwrap();
    assert_eq!(sink.timeout, Duration::from_secs(30));
}

#[tokio::test]
async fn zero_exit_with_event_on_stdin_succeeds() {
    // grep exits 0 only when the pattern is found on stdin
    let props = properties("command: [\"grep\", \"JobRegistered\"]");
    let sink = ExecSink::from_properties(&props).unwrap();
    sink.send(&event()).await.unwrap();
}

#[tokio::test]
async fn nonzero_exit_carries_stderr() {
    let props =
        properties("command: [\"/bin/sh\", \"-c\", \"echo boom >&2; exit 3\"]");
    let sink = ExecSink::from_properties(&props).unwrap();

    let error = sink.send(&event()).await.unwrap_err();
    let message = error.to_string();
    assert!(message.contains("boom"), "message: {message}");
}

#[tokio::test]
async fn slow_command_times_out() {
    let props = properties("command: [\"sleep\", \"30\"]\ntimeout: 1");
    let sink = ExecSink::from_properties(&props).unwrap();

    let error = sink.send(&event()).await.unwrap_err();
    assert!(matches!(error, SinkError::CommandTimeout { seconds: 1 }));
}

#[tokio::test]
async fn missing_binary_is_an_error() {
    let props = properties("command: /definitely/not/a/binary");
    let sink = ExecSink::from_properties(&props).unwrap();
    assert!(sink.send(&event()).await.is_err());
}
