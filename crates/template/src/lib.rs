//! Text interpolation over event data
//!
//! Notification text, routing keys, and Slack blocks are configured as
//! templates interpolating into the event's data map:
//!
//! ```text
//! Job {{ .Payload.Job.ID }} registered ({{ .Topic | lower }})
//! ```
//!
//! An action is a dotted path into the data (leading dot = root), a literal,
//! or a function call, optionally piped through further functions. The
//! registry carries string helpers (`upper`, `lower`, `title`, `trim`,
//! `default`, `len`) and Nomad enrichment lookups (`job`, `jobAllocs`,
//! `jobEvaluations`, `jobSummary`, `evaluation`, `evaluationAllocs`,
//! `deploymentAllocs`) that resolve through an [`Enrich`] provider.
//!
//! # Failure mode
//!
//! A template that fails to parse or execute renders as its own source text.
//! One mistyped field in a message must not drop the whole notification, so
//! errors never propagate to callers.

mod funcs;
mod parse;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use parse::{Operand, Piece};

/// Internal template errors; callers only ever see the original text
#[derive(Debug, Error)]
pub(crate) enum TemplateError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}': {message}")]
    Call { name: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// The enrichment lookups templates can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Job by id
    Job,
    /// Allocations for a job
    JobAllocs,
    /// Evaluations for a job
    JobEvaluations,
    /// Summary for a job
    JobSummary,
    /// Evaluation by id
    Evaluation,
    /// Allocations for an evaluation
    EvaluationAllocs,
    /// Allocations for a deployment
    DeploymentAllocs,
}

/// Provider for enrichment lookups
///
/// Implementations call the Nomad API. Returning `None` (transport error,
/// unknown id) renders as the null sentinel; templates must tolerate it.
#[async_trait]
pub trait Enrich: Send + Sync {
    /// Fetch the requested object by id
    async fn fetch(&self, lookup: Lookup, id: &str) -> Option<Value>;
}

/// The template engine
///
/// Cheap to construct; sinks each hold their own instance, sharing the
/// enrichment provider when one is configured.
#[derive(Clone)]
pub struct Engine {
    provider: Option<Arc<dyn Enrich>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("provider", &self.provider.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Engine {
    /// Create an engine, optionally with an enrichment provider
    ///
    /// Without a provider, enrichment functions resolve to null.
    pub fn new(provider: Option<Arc<dyn Enrich>>) -> Self {
        Self { provider }
    }

    /// Render a template against a data value
    ///
    /// Returns the original template text unchanged when parsing or
    /// execution fails.
    pub async fn render(&self, template: &str, data: &Value) -> String {
        match self.try_render(template, data).await {
            Ok(rendered) => rendered,
            Err(_) => template.to_string(),
        }
    }

    async fn try_render(&self, template: &str, data: &Value) -> Result<String, TemplateError> {
        let pieces = parse::parse(template).map_err(TemplateError::Parse)?;

        let mut out = String::with_capacity(template.len());
        for piece in &pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Action(action) => {
                    let mut value = self.eval_operand(&action.operand, data).await?;
                    for call in &action.pipes {
                        let mut args = Vec::with_capacity(call.args.len() + 1);
                        for arg in &call.args {
                            args.push(self.eval_operand(arg, data).await?);
                        }
                        args.push(value);
                        value = self.call(&call.name, args).await?;
                    }
                    out.push_str(&funcs::stringify(&value));
                }
            }
        }
        Ok(out)
    }

    async fn eval_operand(&self, operand: &Operand, data: &Value) -> Result<Value, TemplateError> {
        match operand {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Path(path) => Ok(nev_event::value::lookup(data, path)
                .cloned()
                .unwrap_or(Value::Null)),
            Operand::Call(call) => {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    args.push(self.eval_operand_boxed(arg, data).await?);
                }
                self.call(&call.name, args).await
            }
        }
    }

    /// Indirection so the async recursion has a fixed-size future
    fn eval_operand_boxed<'a>(
        &'a self,
        operand: &'a Operand,
        data: &'a Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Value, TemplateError>> + Send + 'a>,
    > {
        Box::pin(self.eval_operand(operand, data))
    }

    async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, TemplateError> {
        if let Some(lookup) = enrichment_lookup(name) {
            let id = args.first().and_then(funcs::as_id);
            return Ok(match (&self.provider, id) {
                (Some(provider), Some(id)) => {
                    provider.fetch(lookup, &id).await.unwrap_or(Value::Null)
                }
                _ => Value::Null,
            });
        }

        funcs::call(name, args)
    }
}

fn enrichment_lookup(name: &str) -> Option<Lookup> {
    Some(match name {
        "job" => Lookup::Job,
        "jobAllocs" => Lookup::JobAllocs,
        "jobEvaluations" => Lookup::JobEvaluations,
        "jobSummary" => Lookup::JobSummary,
        "evaluation" => Lookup::Evaluation,
        "evaluationAllocs" => Lookup::EvaluationAllocs,
        "deploymentAllocs" => Lookup::DeploymentAllocs,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Value {
        json!({
            "Topic": "Job",
            "Type": "JobRegistered",
            "Index": 42,
            "Payload": {
                "Job": {"ID": "web", "Version": 3},
                "Tags": ["urgent", "prod"]
            }
        })
    }

    #[tokio::test]
    async fn renders_plain_text_unchanged() {
        let engine = Engine::new(None);
        assert_eq!(engine.render("no actions here", &data()).await, "no actions here");
    }

    #[tokio::test]
    async fn interpolates_paths() {
        let engine = Engine::new(None);
        let out = engine
            .render("{{ .Topic }}/{{ .Type }} for {{ .Payload.Job.ID }}", &data())
            .await;
        assert_eq!(out, "Job/JobRegistered for web");
    }

    #[tokio::test]
    async fn renders_numbers_compactly() {
        let engine = Engine::new(None);
        assert_eq!(engine.render("index {{ .Index }}", &data()).await, "index 42");
    }

    #[tokio::test]
    async fn pipes_apply_left_to_right() {
        let engine = Engine::new(None);
        let out = engine
            .render("{{ .Topic | upper }} {{ .Type | lower | title }}", &data())
            .await;
        assert_eq!(out, "JOB Jobregistered");
    }

    #[tokio::test]
    async fn default_fills_missing_values() {
        let engine = Engine::new(None);
        let out = engine
            .render("ns={{ .Namespace | default \"global\" }}", &data())
            .await;
        assert_eq!(out, "ns=global");

        let out = engine
            .render("id={{ .Payload.Job.ID | default \"none\" }}", &data())
            .await;
        assert_eq!(out, "id=web");
    }

    #[tokio::test]
    async fn len_counts_lists_and_strings() {
        let engine = Engine::new(None);
        let out = engine
            .render("{{ len .Payload.Tags }}/{{ .Payload.Job.ID | len }}", &data())
            .await;
        assert_eq!(out, "2/3");
    }

    #[tokio::test]
    async fn missing_path_renders_no_value() {
        let engine = Engine::new(None);
        let out = engine.render("{{ .Payload.Missing }}", &data()).await;
        assert_eq!(out, "<no value>");
    }

    #[tokio::test]
    async fn parse_error_returns_original() {
        let engine = Engine::new(None);
        for src in ["{{ .Unclosed", "{{ }}", "{{ | upper }}"] {
            assert_eq!(engine.render(src, &data()).await, src, "case: {src}");
        }
    }

    #[tokio::test]
    async fn unknown_function_returns_original() {
        let engine = Engine::new(None);
        let src = "{{ .Topic | sparkle }}";
        assert_eq!(engine.render(src, &data()).await, src);
    }

    struct FakeEnrich;

    #[async_trait]
    impl Enrich for FakeEnrich {
        async fn fetch(&self, lookup: Lookup, id: &str) -> Option<Value> {
            match (lookup, id) {
                (Lookup::Job, "web") => Some(json!({"Status": "running"})),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn enrichment_functions_resolve_through_provider() {
        let engine = Engine::new(Some(Arc::new(FakeEnrich)));
        let out = engine
            .render("{{ job .Payload.Job.ID }}", &data())
            .await;
        assert_eq!(out, r#"{"Status":"running"}"#);
    }

    #[tokio::test]
    async fn enrichment_miss_renders_null_sentinel() {
        let engine = Engine::new(Some(Arc::new(FakeEnrich)));
        let out = engine.render("{{ evaluation \"nope\" }}", &data()).await;
        assert_eq!(out, "<no value>");
    }

    #[tokio::test]
    async fn enrichment_without_provider_is_null() {
        let engine = Engine::new(None);
        let out = engine.render("{{ jobSummary .Payload.Job.ID }}", &data()).await;
        assert_eq!(out, "<no value>");
    }
}
