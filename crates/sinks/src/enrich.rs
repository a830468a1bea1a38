//! Bridge from the template engine's enrichment functions to the Nomad API

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use nev_nomad::Client;
use nev_template::{Enrich, Lookup};

/// Enrichment provider backed by the Nomad API client
///
/// Any transport failure or unknown id resolves to `None`, which templates
/// render as the null sentinel.
pub struct NomadEnricher {
    client: Arc<Client>,
}

impl NomadEnricher {
    /// Wrap a client for use by template engines
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Enrich for NomadEnricher {
    async fn fetch(&self, lookup: Lookup, id: &str) -> Option<Value> {
        let result = match lookup {
            Lookup::Job => self.client.job(id).await,
            Lookup::JobAllocs => self.client.job_allocations(id).await,
            Lookup::JobEvaluations => self.client.job_evaluations(id).await,
            Lookup::JobSummary => self.client.job_summary(id).await,
            Lookup::Evaluation => self.client.evaluation(id).await,
            Lookup::EvaluationAllocs => self.client.evaluation_allocations(id).await,
            Lookup::DeploymentAllocs => self.client.deployment_allocations(id).await,
        };

        match result {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(id = %id, error = %error, "enrichment lookup failed");
                None
            }
        }
    }
}
