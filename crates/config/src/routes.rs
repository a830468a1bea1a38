//! Routing rule configuration
//!
//! Routes form a tree. A node's filter scopes everything beneath it: children
//! are only evaluated when the parent matched. `continue: false` on a
//! matching node stops evaluation of its *later siblings* after its subtree
//! has been processed; it does not affect the node's own children.
//!
//! # Example
//!
//! ```yaml
//! routes:
//!   - filter: event.Topic == 'Job'
//!     continue: false
//!     routes:
//!       - filter: event.Type == 'JobRegistered'
//!         output: slack_alerts
//!   - filter: ""
//!     output: archive
//! ```

use serde::Deserialize;

/// A single routing rule, possibly with children
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Predicate source; empty matches every event
    pub filter: String,

    /// Output id to dispatch to when this node matches
    pub output: Option<String>,

    /// Whether to keep evaluating later siblings after this node matches
    #[serde(rename = "continue")]
    pub continue_siblings: bool,

    /// Child rules, evaluated only when this node matches
    pub routes: Vec<RouteConfig>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            filter: String::new(),
            output: None,
            continue_siblings: true,
            routes: Vec::new(),
        }
    }
}

impl RouteConfig {
    /// Whether this node carries anything to do
    pub fn is_empty(&self) -> bool {
        self.output.is_none() && self.routes.is_empty()
    }
}
