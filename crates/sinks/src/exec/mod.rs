//! Exec sink
//!
//! Spawns a child process per event and feeds the JSON-encoded event on
//! stdin. Nonzero exit is an error carrying the child's stderr; the whole
//! execution runs under a timeout (default 30s).
//!
//! ```yaml
//! outputs:
//!   pager:
//!     type: exec
//!     command: ["/usr/local/bin/page-oncall", "--team", "platform"]
//!     timeout: 10
//!     workdir: /var/lib/nomad-events
//!     env:
//!       PAGER_ENV: production
//! ```

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use nev_event::Event;

use crate::{Sink, SinkError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Exec sink
#[derive(Debug)]
pub struct ExecSink {
    command: Vec<String>,
    timeout: Duration,
    workdir: Option<String>,
    env: Vec<(String, String)>,
}

impl ExecSink {
    /// Construct from output properties
    ///
    /// # Errors
    ///
    /// `command` is required, as a string (whitespace-split) or a list of
    /// strings; `timeout` is whole seconds.
    pub fn from_properties(properties: &Map<String, Value>) -> Result<Self, SinkError> {
        let command = match properties.get("command") {
            None => return Err(SinkError::missing("exec", "command")),
            Some(Value::String(line)) => {
                line.split_whitespace().map(str::to_string).collect::<Vec<_>>()
            }
            Some(Value::Array(parts)) => parts
                .iter()
                .map(|part| {
                    part.as_str().map(str::to_string).ok_or_else(|| {
                        SinkError::invalid("exec", "command", "arguments must be strings")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(SinkError::invalid(
                    "exec",
                    "command",
                    "must be a string or list of strings",
                ));
            }
        };
        if command.is_empty() {
            return Err(SinkError::invalid("exec", "command", "cannot be empty"));
        }

        let timeout = match properties.get("timeout") {
            None => DEFAULT_TIMEOUT,
            Some(value) => match value.as_u64() {
                Some(seconds) => Duration::from_secs(seconds),
                None => {
                    return Err(SinkError::invalid(
                        "exec",
                        "timeout",
                        "must be whole seconds",
                    ));
                }
            },
        };

        let workdir = properties
            .get("workdir")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut env = Vec::new();
        if let Some(configured) = properties.get("env").and_then(Value::as_object) {
            for (key, value) in configured {
                let Some(value) = value.as_str() else {
                    return Err(SinkError::invalid(
                        "exec",
                        "env",
                        format!("'{key}' must be a string"),
                    ));
                };
                env.push((key.clone(), value.to_string()));
            }
        }

        Ok(Self {
            command,
            timeout,
            workdir,
            env,
        })
    }
}

#[async_trait]
impl Sink for ExecSink {
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let body = serde_json::to_vec(event)?;

        let mut command = Command::new(&self.command[0]);
        command
            .args(&self.command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Dropping the future on timeout must not leak the child
            .kill_on_drop(true);

        if let Some(workdir) = &self.workdir {
            command.current_dir(workdir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let mut child = command.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&body).await?;
            // Drop closes the pipe so the child sees EOF
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SinkError::CommandTimeout {
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(SinkError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "exec_test.rs"]
mod exec_test;
