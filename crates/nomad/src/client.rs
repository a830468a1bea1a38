//! Thin HTTP client over the Nomad API

use std::fs;
use std::net::ToSocketAddrs;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Certificate, Identity, Response, Url};
use serde_json::Value;

use nev_config::NomadConfig;

use crate::error::ClientError;

/// Per-request timeout for everything except the long-lived stream
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const TOKEN_HEADER: &str = "X-Nomad-Token";

/// Nomad API client
///
/// Holds the connection settings for the lifetime of the process; the
/// address and token are not hot-reloadable.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
}

impl Client {
    /// Build a client from connection settings
    ///
    /// # Errors
    ///
    /// Fails on an unparseable address, unreadable TLS material, or an
    /// unresolvable `server_name` override. Network reachability is not
    /// checked here; the first request finds out.
    pub fn new(config: &NomadConfig) -> Result<Self, ClientError> {
        let mut base = Url::parse(&config.address).map_err(|e| ClientError::InvalidAddress {
            address: config.address.clone(),
            message: e.to_string(),
        })?;

        let mut builder = reqwest::Client::builder();

        if !config.token.is_empty() {
            let mut headers = HeaderMap::new();
            let value = HeaderValue::from_str(&config.token)
                .map_err(|e| ClientError::InvalidToken {
                    message: e.to_string(),
                })?;
            headers.insert(TOKEN_HEADER, value);
            builder = builder.default_headers(headers);
        }

        if let Some(tls) = config.tls.as_ref().filter(|tls| tls.enabled) {
            // rustls handles both the CA roots and PEM client identities
            builder = builder.use_rustls_tls();

            if tls.insecure_skip_verify {
                builder = builder.danger_accept_invalid_certs(true);
            }

            if let Some(path) = &tls.ca_cert {
                let pem = fs::read(path).map_err(|e| ClientError::Tls {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| ClientError::Tls {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                builder = builder.add_root_certificate(cert);
            }

            if let (Some(cert_path), Some(key_path)) = (&tls.client_cert, &tls.client_key) {
                let mut pem = fs::read(cert_path).map_err(|e| ClientError::Tls {
                    path: cert_path.clone(),
                    message: e.to_string(),
                })?;
                pem.extend(fs::read(key_path).map_err(|e| ClientError::Tls {
                    path: key_path.clone(),
                    message: e.to_string(),
                })?);
                let identity = Identity::from_pem(&pem).map_err(|e| ClientError::Tls {
                    path: cert_path.clone(),
                    message: e.to_string(),
                })?;
                builder = builder.identity(identity);
            }

            // A server_name override validates against that name while still
            // dialing the configured address: pin the resolved socket address
            // under the override name and swap the URL host.
            if let Some(server_name) = &tls.server_name {
                let host = base
                    .host_str()
                    .ok_or_else(|| ClientError::InvalidAddress {
                        address: config.address.clone(),
                        message: "address has no host".into(),
                    })?
                    .to_string();
                let port = base.port_or_known_default().unwrap_or(4646);
                let addr = (host.as_str(), port)
                    .to_socket_addrs()
                    .map_err(|e| ClientError::Resolve {
                        host: host.clone(),
                        message: e.to_string(),
                    })?
                    .next()
                    .ok_or_else(|| ClientError::Resolve {
                        host: host.clone(),
                        message: "no addresses".into(),
                    })?;

                builder = builder.resolve(server_name, addr);
                base.set_host(Some(server_name))
                    .map_err(|e| ClientError::InvalidAddress {
                        address: config.address.clone(),
                        message: e.to_string(),
                    })?;
            }
        }

        let http = builder.build().map_err(ClientError::Http)?;

        Ok(Self { http, base })
    }

    /// Open the long-poll event stream starting from an index
    ///
    /// Index zero means "from current". The topic filter is wide open; the
    /// route tree does the narrowing.
    pub async fn stream_events(&self, index: u64) -> Result<Response, ClientError> {
        let url = self.endpoint("/v1/event/stream")?;
        let response = self
            .http
            .get(url)
            .query(&[("index", index.to_string().as_str()), ("topic", "*:*")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: "/v1/event/stream".into(),
            });
        }
        Ok(response)
    }

    /// Fetch job versions with diffs enabled
    ///
    /// Returns the `(Versions, Diffs)` lists from the API body.
    pub async fn job_versions(&self, job_id: &str) -> Result<(Vec<Value>, Vec<Value>), ClientError> {
        let path = format!("/v1/job/{job_id}/versions");
        let body = self.get_json(&path, &[("diffs", "true")]).await?;

        let versions = body
            .get("Versions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let diffs = body
            .get("Diffs")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok((versions, diffs))
    }

    /// The structured diff between a job's current and prior version
    ///
    /// # Errors
    ///
    /// Fails when the API has no diffs for the job, as well as on transport
    /// errors; callers treat any failure as "no diff".
    pub async fn job_diff(&self, job_id: &str) -> Result<Value, ClientError> {
        let (_, diffs) = self.job_versions(job_id).await?;
        diffs
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Decode {
                path: format!("/v1/job/{job_id}/versions"),
                message: "no job diffs available".into(),
            })
    }

    /// Job by id
    pub async fn job(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/v1/job/{id}"), &[]).await
    }

    /// Allocations for a job, including completed ones
    pub async fn job_allocations(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/v1/job/{id}/allocations"), &[("all", "true")])
            .await
    }

    /// Evaluations for a job
    pub async fn job_evaluations(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/v1/job/{id}/evaluations"), &[]).await
    }

    /// Summary for a job
    pub async fn job_summary(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/v1/job/{id}/summary"), &[]).await
    }

    /// Evaluation by id
    pub async fn evaluation(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/v1/evaluation/{id}"), &[]).await
    }

    /// Allocations for an evaluation
    pub async fn evaluation_allocations(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/v1/evaluation/{id}/allocations"), &[])
            .await
    }

    /// Allocations for a deployment
    pub async fn deployment_allocations(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("/v1/deployment/allocations/{id}"), &[])
            .await
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .query(query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        response.json().await.map_err(|e| ClientError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(|e| ClientError::InvalidAddress {
            address: self.base.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nev_config::NomadConfig;

    fn config(address: &str) -> NomadConfig {
        NomadConfig {
            address: address.to_string(),
            ..NomadConfig::default()
        }
    }

    #[test]
    fn builds_from_plain_address() {
        let client = Client::new(&config("http://localhost:4646")).unwrap();
        assert_eq!(
            client.endpoint("/v1/event/stream").unwrap().as_str(),
            "http://localhost:4646/v1/event/stream"
        );
    }

    #[test]
    fn rejects_garbage_address() {
        assert!(Client::new(&config("not a url")).is_err());
    }

    #[test]
    fn rejects_unprintable_token() {
        let mut cfg = config("http://localhost:4646");
        cfg.token = "bad\ntoken".to_string();
        assert!(matches!(
            Client::new(&cfg),
            Err(ClientError::InvalidToken { .. })
        ));
    }

    #[test]
    fn missing_cert_file_fails_at_build() {
        let mut cfg = config("https://localhost:4646");
        cfg.tls = Some(nev_config::TlsConfig {
            enabled: true,
            ca_cert: Some("/definitely/not/there/ca.pem".into()),
            ..nev_config::TlsConfig::default()
        });
        assert!(matches!(Client::new(&cfg), Err(ClientError::Tls { .. })));
    }
}
