//! Sink registry
//!
//! Builds every configured sink up front and dispatches by output id. A
//! registry is immutable once built; hot reload constructs a replacement and
//! the service manager swaps pointers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use nev_config::OutputConfig;
use nev_event::Event;
use nev_nomad::Client;
use nev_template::{Enrich, Engine};

use crate::exec::ExecSink;
use crate::http::HttpSink;
use crate::rabbitmq::RabbitMqSink;
use crate::slack::SlackSink;
use crate::stdout::StdoutSink;
use crate::{NomadEnricher, RetrySink, Sink, SinkError};

/// All configured sinks, keyed by output id
pub struct Registry {
    sinks: HashMap<String, Arc<dyn Sink>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sinks", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Build every output from configuration
    ///
    /// The Nomad client feeds template enrichment functions; without one
    /// (config validation mode) they resolve to null.
    ///
    /// # Errors
    ///
    /// Fails on the first output whose properties are unusable; nothing is
    /// kept from a partially built registry.
    pub fn build(
        outputs: &BTreeMap<String, OutputConfig>,
        client: Option<Arc<Client>>,
    ) -> Result<Self, SinkError> {
        let provider: Option<Arc<dyn Enrich>> = client
            .map(|client| Arc::new(NomadEnricher::new(client)) as Arc<dyn Enrich>);

        let mut sinks: HashMap<String, Arc<dyn Sink>> = HashMap::with_capacity(outputs.len());
        for (id, config) in outputs {
            let sink = build_sink(config, provider.clone())?;
            tracing::debug!(output = %id, output_type = %config.output_type, "sink registered");
            sinks.insert(id.clone(), sink);
        }

        Ok(Self { sinks })
    }

    /// Deliver an event to one output
    ///
    /// # Errors
    ///
    /// [`SinkError::UnknownOutput`] for an unregistered id, otherwise
    /// whatever the sink (or its retry wrapper) reports.
    pub async fn send(&self, id: &str, event: &Event) -> Result<(), SinkError> {
        let sink = self
            .sinks
            .get(id)
            .ok_or_else(|| SinkError::UnknownOutput(id.to_string()))?;
        sink.send(event).await
    }

    /// Whether an output id is registered
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.sinks.contains_key(id)
    }

    /// Number of registered outputs
    #[inline]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether the registry is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// Construct one sink, wrapped with retries when configured
fn build_sink(
    config: &OutputConfig,
    provider: Option<Arc<dyn Enrich>>,
) -> Result<Arc<dyn Sink>, SinkError> {
    let sink: Arc<dyn Sink> = match config.output_type.as_str() {
        "stdout" => Arc::new(StdoutSink::from_properties(
            &config.properties,
            Engine::new(provider),
        )?),
        "slack" => Arc::new(SlackSink::from_properties(
            &config.properties,
            Engine::new(provider),
        )?),
        "http" => Arc::new(HttpSink::from_properties(&config.properties)?),
        // The routing-key template has no use for enrichment lookups
        "rabbitmq" => Arc::new(RabbitMqSink::from_properties(
            &config.properties,
            Engine::new(None),
        )?),
        "exec" => Arc::new(ExecSink::from_properties(&config.properties)?),
        other => return Err(SinkError::UnsupportedType(other.to_string())),
    };

    let Some(retry) = &config.retry else {
        return Ok(sink);
    };

    let base_delay = retry.base_delay().map_err(|message| {
        SinkError::invalid("retry", "base_delay", message)
    })?;
    Ok(Arc::new(RetrySink::new(sink, retry.max_retries, base_delay)))
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
