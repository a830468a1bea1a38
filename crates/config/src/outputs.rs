//! Output (sink) configuration
//!
//! Each output has a `type`, an optional `retry` block, and a free-form set
//! of per-type properties that the sink constructor interprets
//! (`webhook_url` for slack, `command` for exec, and so on).

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Output types the sink registry knows how to construct
pub const KNOWN_OUTPUT_TYPES: &[&str] = &["stdout", "slack", "http", "rabbitmq", "exec"];

/// Configuration for a single output destination
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Sink type: stdout, slack, http, rabbitmq, or exec
    #[serde(rename = "type")]
    pub output_type: String,

    /// Optional retry policy; absent means a single attempt
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// Per-type properties, passed through to the sink constructor
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl OutputConfig {
    /// Look up a string property
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Retry policy for an output
///
/// Attempts sleep `base_delay * 2^(attempt-1)` between failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts before giving up
    pub max_retries: u32,

    /// Delay before the second attempt, as a duration string ("1s", "500ms")
    pub base_delay: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: "1s".to_string(),
        }
    }
}

impl RetryConfig {
    /// The parsed base delay
    ///
    /// # Errors
    ///
    /// Returns a message describing why the duration string is invalid;
    /// validation surfaces this at load time.
    pub fn base_delay(&self) -> Result<Duration, String> {
        parse_duration(&self.base_delay)
    }
}

/// Parse a duration string with `ms`, `s`, or `m` suffix
///
/// A bare number is rejected so configs are explicit about units.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }

    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(split) => s.split_at(split),
        None => return Err("missing unit, use e.g. \"1s\", \"500ms\", \"2m\"".into()),
    };

    let amount: f64 = digits
        .parse()
        .map_err(|_| format!("invalid number '{digits}'"))?;

    let millis = match unit {
        "ms" => amount,
        "s" => amount * 1_000.0,
        "m" => amount * 60_000.0,
        other => return Err(format!("unknown unit '{other}'")),
    };

    if millis < 0.0 {
        return Err("duration must be non-negative".into());
    }
    Ok(Duration::from_millis(millis as u64))
}
