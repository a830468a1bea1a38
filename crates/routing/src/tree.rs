//! Compiled route tree and traversal

use nev_config::RouteConfig;
use nev_event::Event;
use nev_expr::{ExprError, Program};
use serde_json::Value;

/// A compiled route tree
///
/// Immutable after construction; hot reload builds a fresh tree and swaps
/// the pointer rather than mutating in place.
#[derive(Debug)]
pub struct Router {
    rules: Vec<Rule>,
}

/// One compiled rule node
#[derive(Debug)]
struct Rule {
    filter: Program,
    output: Option<String>,
    continue_siblings: bool,
    children: Vec<Rule>,
}

impl Router {
    /// Compile a route tree from configuration
    ///
    /// # Errors
    ///
    /// Returns the first predicate compile error; this surfaces at load or
    /// reload, never at dispatch.
    pub fn compile(routes: &[RouteConfig]) -> Result<Self, ExprError> {
        let rules = routes
            .iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// An empty router matching nothing
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Route an event to its matching outputs
    ///
    /// Returns output ids in depth-first pre-order of matching rules. The
    /// list is a multiset: distinct rules referencing the same output yield
    /// it once per match.
    pub fn route(&self, event: &Event) -> Vec<String> {
        let env = env_for(event);
        let mut matched = Vec::new();
        visit(&self.rules, &env, &mut matched);
        matched
    }

    /// Number of top-level rules
    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Rule {
    fn compile(config: &RouteConfig) -> Result<Self, ExprError> {
        let filter = Program::compile(&config.filter)?;
        let children = config
            .routes
            .iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            filter,
            output: config.output.clone(),
            continue_siblings: config.continue_siblings,
            children,
        })
    }
}

/// The evaluation environment: `event` plus the `diff` shortcut alias
fn env_for(event: &Event) -> Value {
    let mut env = serde_json::Map::new();
    env.insert("event".into(), event.to_value());
    env.insert(
        "diff".into(),
        event.diff.clone().unwrap_or(Value::Null),
    );
    Value::Object(env)
}

/// Visit one sibling level; returns early when a matching rule asked its
/// later siblings to be skipped
fn visit(rules: &[Rule], env: &Value, matched: &mut Vec<String>) {
    for rule in rules {
        let hit = match rule.filter.eval(env) {
            Ok(hit) => hit,
            Err(error) => {
                // One bad rule must not suppress its siblings
                tracing::warn!(
                    filter = rule.filter.source(),
                    error = %error,
                    "route filter failed to evaluate, treating as no match"
                );
                false
            }
        };

        if !hit {
            continue;
        }

        if let Some(output) = &rule.output {
            matched.push(output.clone());
        }

        visit(&rule.children, env, matched);

        if !rule.continue_siblings {
            return;
        }
    }
}
