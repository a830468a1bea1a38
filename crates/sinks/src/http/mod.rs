//! Generic HTTP sink
//!
//! Issues one request per event with the JSON-encoded event as the body.
//! Method, headers, and timeout are configurable; any 2xx response counts as
//! delivered.
//!
//! ```yaml
//! outputs:
//!   archive:
//!     type: http
//!     url: http://archive.internal/events
//!     method: PUT
//!     timeout: 5
//!     headers:
//!       Authorization: Bearer abc
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

use nev_event::Event;

use crate::{Sink, SinkError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP sink
#[derive(Debug)]
pub struct HttpSink {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl HttpSink {
    /// Construct from output properties
    ///
    /// # Errors
    ///
    /// `url` is required; `method` must be a valid HTTP method; `timeout`
    /// is whole seconds.
    pub fn from_properties(properties: &Map<String, Value>) -> Result<Self, SinkError> {
        let url = properties
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SinkError::missing("http", "url"))?
            .to_string();

        let method = match properties.get("method").and_then(Value::as_str) {
            None => Method::POST,
            Some(name) => Method::from_bytes(name.to_uppercase().as_bytes())
                .map_err(|_| SinkError::invalid("http", "method", format!("'{name}'")))?,
        };

        let mut headers = Vec::new();
        if let Some(configured) = properties.get("headers").and_then(Value::as_object) {
            for (key, value) in configured {
                let Some(value) = value.as_str() else {
                    return Err(SinkError::invalid(
                        "http",
                        "headers",
                        format!("'{key}' must be a string"),
                    ));
                };
                headers.push((key.clone(), value.to_string()));
            }
        }

        let timeout = match properties.get("timeout") {
            None => DEFAULT_TIMEOUT,
            Some(value) => match value.as_u64() {
                Some(seconds) => Duration::from_secs(seconds),
                None => {
                    return Err(SinkError::invalid(
                        "http",
                        "timeout",
                        "must be whole seconds",
                    ));
                }
            },
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SinkError::Http)?;

        Ok(Self {
            url,
            method,
            headers,
            client,
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .json(event);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
