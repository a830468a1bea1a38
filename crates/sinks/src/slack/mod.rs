//! Slack sink
//!
//! Posts events to an incoming-webhook URL. Messages carry an optional
//! channel override, an optional top-level text template, and Block Kit
//! blocks expanded per event by the [`builder`].
//!
//! ```yaml
//! outputs:
//!   deploys:
//!     type: slack
//!     webhook_url: https://hooks.slack.com/services/T/B/X
//!     channel: "#deploys"
//!     text: "{{ .Topic }}/{{ .Type }}"
//!     blocks:
//!       - type: header
//!         text: "Job {{ .Payload.Job.ID }}"
//!       - type: section
//!         condition: "has(event.Payload.Job)"
//!         text: "version {{ .Payload.Job.Version }}"
//! ```

pub mod blocks;
pub mod builder;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use nev_event::Event;
use nev_template::Engine;

use crate::{Sink, SinkError};

use blocks::Block;
use builder::BlockBuilder;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// The webhook message body
#[derive(Debug, Serialize)]
struct SlackMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    blocks: Vec<Block>,
}

/// Slack webhook sink
#[derive(Debug)]
pub struct SlackSink {
    webhook_url: String,
    channel: Option<String>,
    text_template: Option<String>,
    block_configs: Vec<Value>,
    engine: Engine,
    builder: BlockBuilder,
    client: reqwest::Client,
}

impl SlackSink {
    /// Construct from output properties
    ///
    /// # Errors
    ///
    /// `webhook_url` is required; `blocks` must be a list when present.
    pub fn from_properties(
        properties: &Map<String, Value>,
        engine: Engine,
    ) -> Result<Self, SinkError> {
        let webhook_url = properties
            .get("webhook_url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SinkError::missing("slack", "webhook_url"))?
            .to_string();

        let channel = properties
            .get("channel")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let text_template = properties
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let block_configs = match properties.get("blocks") {
            None => Vec::new(),
            Some(Value::Array(configured)) => configured.clone(),
            Some(_) => {
                return Err(SinkError::invalid("slack", "blocks", "must be a list"));
            }
        };

        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(SinkError::Http)?;

        Ok(Self {
            webhook_url,
            channel,
            text_template,
            block_configs,
            builder: BlockBuilder::new(engine.clone()),
            engine,
            client,
        })
    }

    /// Build the outgoing message; None means "suppress this notification"
    async fn format_event(&self, event: &Event) -> Result<Option<SlackMessage>, SinkError> {
        let blocks = self.builder.build(&self.block_configs, event).await?;

        // Blocks were configured but every one filtered out, and there is no
        // text fallback: sending would produce a visually empty message.
        if !self.block_configs.is_empty() && blocks.is_empty() && self.text_template.is_none() {
            return Ok(None);
        }

        let text = match &self.text_template {
            Some(template) => Some(self.engine.render(template, &event.to_value()).await),
            None => None,
        };

        Ok(Some(SlackMessage {
            channel: self.channel.clone(),
            text,
            blocks,
        }))
    }
}

#[async_trait]
impl Sink for SlackSink {
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let Some(message) = self.format_event(event).await? else {
            tracing::debug!(
                topic = %event.topic,
                event_type = %event.event_type,
                "all blocks filtered out, suppressing empty message"
            );
            return Ok(());
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SinkError::Status {
                url: self.webhook_url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
