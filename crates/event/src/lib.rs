//! Core event record shared by every stage of the pipeline
//!
//! An [`Event`] is produced once by the ingest consumer and is immutable from
//! then on. Payloads are arbitrary JSON from the Nomad event stream, so they
//! are kept as [`serde_json::Value`] trees and navigated late-bound via the
//! [`value`] helpers rather than decoded into typed structs.

pub mod value;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single event from the Nomad event stream
///
/// Field names on the wire follow Nomad's PascalCase convention; `diff` is
/// only present when the ingest-side enrichment succeeded for this event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event category (e.g. "Node", "Job", "Deployment")
    #[serde(rename = "Topic")]
    pub topic: String,

    /// Event subtype (e.g. "NodeRegistration", "JobRegistered")
    #[serde(rename = "Type")]
    pub event_type: String,

    /// Opaque identifier of the affected resource
    #[serde(rename = "Key", default)]
    pub key: String,

    /// Namespace of the affected resource, may be empty
    #[serde(rename = "Namespace", default)]
    pub namespace: String,

    /// Monotonically non-decreasing stream cursor
    #[serde(rename = "Index", default)]
    pub index: u64,

    /// Decoded wire payload
    #[serde(rename = "Payload", default)]
    pub payload: Value,

    /// Structured job diff, attached by enrichment when available
    #[serde(rename = "Diff", default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Value>,
}

impl Event {
    /// Create an event with empty key/namespace and no payload
    ///
    /// Mostly useful in tests; the ingest consumer builds events directly
    /// from decoded stream frames.
    pub fn new(topic: impl Into<String>, event_type: impl Into<String>, index: u64) -> Self {
        Self {
            topic: topic.into(),
            event_type: event_type.into(),
            key: String::new(),
            namespace: String::new(),
            index,
            payload: Value::Null,
            diff: None,
        }
    }

    /// Project the event into the map consumed by templates and predicates
    ///
    /// Keys keep the wire casing so user-facing expressions read the same as
    /// the raw API (`event.Topic`, `.Payload.Job.ID`). `Diff` is only present
    /// when enrichment produced one.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("Topic".into(), Value::String(self.topic.clone()));
        map.insert("Type".into(), Value::String(self.event_type.clone()));
        map.insert("Key".into(), Value::String(self.key.clone()));
        map.insert("Namespace".into(), Value::String(self.namespace.clone()));
        map.insert("Index".into(), Value::from(self.index));
        map.insert("Payload".into(), self.payload.clone());
        if let Some(diff) = &self.diff {
            map.insert("Diff".into(), diff.clone());
        }
        Value::Object(map)
    }
}
