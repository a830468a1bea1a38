//! Stdout sink
//!
//! Writes one line per event: the JSON-encoded event (default), or a
//! rendered text template when `format: text` is configured.
//!
//! ```yaml
//! outputs:
//!   console:
//!     type: stdout
//!     format: text
//!     text: "{{ .Topic }}/{{ .Type }} {{ .Payload.Job.ID }}"
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;

use nev_event::Event;
use nev_template::Engine;

use crate::{Sink, SinkError};

/// Output format for the stdout sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Text,
}

/// Stdout sink
#[derive(Debug)]
pub struct StdoutSink {
    format: Format,
    text_template: String,
    engine: Engine,
}

impl StdoutSink {
    /// Construct from output properties
    ///
    /// # Errors
    ///
    /// `format` must be `json` or `text`; `text` format requires a `text`
    /// template.
    pub fn from_properties(
        properties: &Map<String, Value>,
        engine: Engine,
    ) -> Result<Self, SinkError> {
        let format = match properties.get("format").and_then(Value::as_str) {
            None | Some("json") => Format::Json,
            Some("text") => Format::Text,
            Some(other) => {
                return Err(SinkError::invalid(
                    "stdout",
                    "format",
                    format!("'{other}' must be 'json' or 'text'"),
                ));
            }
        };

        let text_template = properties
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if format == Format::Text && text_template.is_empty() {
            return Err(SinkError::missing("stdout", "text"));
        }

        Ok(Self {
            format,
            text_template,
            engine,
        })
    }

    async fn format_event(&self, event: &Event) -> Result<String, SinkError> {
        match self.format {
            Format::Json => Ok(serde_json::to_string(event)?),
            Format::Text => Ok(self.engine.render(&self.text_template, &event.to_value()).await),
        }
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let mut line = self.format_event(event).await?;
        line.push('\n');

        let mut stdout = tokio::io::stdout();
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "stdout_test.rs"]
mod stdout_test;
