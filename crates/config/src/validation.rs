//! Configuration validation
//!
//! Validates config consistency at load time:
//! - Nomad address is present
//! - Every output uses a known type and its retry delay parses
//! - Every route node has an output or child routes
//! - Every referenced output id is declared
//! - TLS client cert/key come as a pair and named files exist

use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::routes::RouteConfig;
use crate::{Config, KNOWN_OUTPUT_TYPES};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.nomad.address.trim().is_empty() {
        return Err(ConfigError::MissingAddress);
    }

    validate_tls(config)?;
    validate_outputs(config)?;
    validate_routes(config)?;
    Ok(())
}

fn validate_tls(config: &Config) -> Result<()> {
    let Some(tls) = &config.nomad.tls else {
        return Ok(());
    };
    if !tls.enabled {
        return Ok(());
    }

    if tls.client_cert.is_some() != tls.client_key.is_some() {
        return Err(ConfigError::PartialClientCert);
    }

    for (field, path) in [
        ("ca_cert", &tls.ca_cert),
        ("client_cert", &tls.client_cert),
        ("client_key", &tls.client_key),
    ] {
        if let Some(path) = path {
            if !Path::new(path).exists() {
                return Err(ConfigError::MissingCertFile {
                    field,
                    path: path.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_outputs(config: &Config) -> Result<()> {
    for (name, output) in &config.outputs {
        if !KNOWN_OUTPUT_TYPES.contains(&output.output_type.as_str()) {
            return Err(ConfigError::UnknownOutputType {
                output: name.clone(),
                output_type: output.output_type.clone(),
            });
        }

        if let Some(retry) = &output.retry {
            retry.base_delay().map_err(|message| ConfigError::InvalidDelay {
                output: name.clone(),
                value: retry.base_delay.clone(),
                message,
            })?;
        }
    }
    Ok(())
}

fn validate_routes(config: &Config) -> Result<()> {
    for (i, route) in config.routes.iter().enumerate() {
        validate_route(config, route, &format!("routes[{i}]"))?;
    }
    Ok(())
}

fn validate_route(config: &Config, route: &RouteConfig, position: &str) -> Result<()> {
    if route.is_empty() {
        return Err(ConfigError::EmptyRoute {
            route: position.to_string(),
        });
    }

    if let Some(output) = &route.output {
        if !config.outputs.contains_key(output) {
            return Err(ConfigError::UnknownOutput {
                output: output.clone(),
            });
        }
    }

    for (i, child) in route.routes.iter().enumerate() {
        validate_route(config, child, &format!("{position}.routes[{i}]"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn base_yaml(routes: &str) -> String {
        format!(
            "nomad:\n  address: http://localhost:4646\noutputs:\n  console:\n    type: stdout\nroutes:\n{routes}"
        )
    }

    #[test]
    fn accepts_nested_routes() {
        let yaml = base_yaml(
            "  - filter: event.Topic == 'Job'\n    routes:\n      - output: console\n",
        );
        assert!(Config::from_str(&yaml).is_ok());
    }

    #[test]
    fn reports_nested_empty_route_position() {
        let yaml = base_yaml(
            "  - filter: event.Topic == 'Job'\n    routes:\n      - filter: event.Type == 'X'\n",
        );
        let err = Config::from_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("routes[0].routes[0]"));
    }

    #[test]
    fn rejects_unknown_output_type() {
        let yaml = r#"
nomad:
  address: http://localhost:4646
outputs:
  weird:
    type: carrier_pigeon
routes:
  - output: weird
"#;
        let err = Config::from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("carrier_pigeon"));
    }

    #[test]
    fn rejects_bad_retry_delay() {
        let yaml = r#"
nomad:
  address: http://localhost:4646
outputs:
  console:
    type: stdout
    retry:
      base_delay: soon
routes:
  - output: console
"#;
        let err = Config::from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn rejects_partial_client_cert() {
        let yaml = r#"
nomad:
  address: https://nomad:4646
  tls:
    enabled: true
    client_cert: /tmp/cert.pem
outputs:
  console:
    type: stdout
routes:
  - output: console
"#;
        let err = Config::from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("client_cert and client_key"));
    }

    #[test]
    fn rejects_missing_cert_file() {
        let yaml = r#"
nomad:
  address: https://nomad:4646
  tls:
    enabled: true
    ca_cert: /definitely/not/there/ca.pem
outputs:
  console:
    type: stdout
routes:
  - output: console
"#;
        let err = Config::from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("ca.pem"));
    }

    #[test]
    fn cert_files_are_checked_when_present() {
        use std::io::Write;

        let mut ca = tempfile::NamedTempFile::new().unwrap();
        writeln!(ca, "-----BEGIN CERTIFICATE-----").unwrap();

        let yaml = format!(
            r#"
nomad:
  address: https://nomad:4646
  tls:
    enabled: true
    ca_cert: {}
outputs:
  console:
    type: stdout
routes:
  - output: console
"#,
            ca.path().display()
        );
        assert!(Config::from_str(&yaml).is_ok());
    }

    #[test]
    fn disabled_tls_skips_checks() {
        let yaml = r#"
nomad:
  address: https://nomad:4646
  tls:
    enabled: false
    client_cert: /nope.pem
outputs:
  console:
    type: stdout
routes:
  - output: console
"#;
        assert!(Config::from_str(yaml).is_ok());
    }
}
