//! Stdout sink tests

use super::*;

use serde_json::json;

fn properties(yaml: &str) -> Map<String, Value> {
    let value: Value = serde_yaml::from_str(yaml).unwrap();
    value.as_object().cloned().unwrap_or_default()
}

fn event() -> Event {
    Event {
        payload: json!({"Job": {"ID": "web"}}),
        ..Event::new("Job", "JobRegistered", 9)
    }
}

#[test]
fn defaults_to_json_format() {
    let sink = StdoutSink::from_properties(&Map::new(), Engine::new(None)).unwrap();
    assert_eq!(sink.format, Format::Json);
}

#[test]
fn rejects_unknown_format() {
    let props = properties("format: yaml");
    assert!(StdoutSink::from_properties(&props, Engine::new(None)).is_err());
}

#[test]
fn text_format_requires_template() {
    let props = properties("format: text");
    let err = StdoutSink::from_properties(&props, Engine::new(None)).unwrap_err();
    assert!(err.to_string().contains("text"));
}

#[tokio::test]
async fn json_format_is_single_line_event() {
    let sink = StdoutSink::from_properties(&Map::new(), Engine::new(None)).unwrap();
    let line = sink.format_event(&event()).await.unwrap();

    assert!(!line.contains('\n'));
    let decoded: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(decoded["Topic"], "Job");
    assert_eq!(decoded["Index"], 9);
    assert_eq!(decoded["Payload"]["Job"]["ID"], "web");
}

#[tokio::test]
async fn text_format_renders_template() {
    let props = properties("format: text\ntext: \"{{ .Topic }}:{{ .Payload.Job.ID }}\"");
    let sink = StdoutSink::from_properties(&props, Engine::new(None)).unwrap();

    let line = sink.format_event(&event()).await.unwrap();
    assert_eq!(line, "Job:web");
}
