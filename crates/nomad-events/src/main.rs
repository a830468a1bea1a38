//! nomad-events - Nomad event stream processor
//!
//! Connects to Nomad's event stream API and processes events through a
//! configurable routing engine, forwarding them to output destinations:
//! Slack, HTTP webhooks, RabbitMQ, command execution, or stdout.
//!
//! # Usage
//!
//! ```bash
//! # Run with the default config
//! nomad-events
//!
//! # Run with a custom config
//! nomad-events --config /etc/nomad-events/config.yaml
//!
//! # Validate configuration and exit
//! nomad-events --validate-config
//!
//! # Reload configuration without restart
//! kill -HUP <pid>
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nev_config::Config;
use nev_nomad::{Client, EventStream};
use nev_routing::Router;
use nev_sinks::Registry;
use nomad_events::service::ServiceManager;
use nomad_events::{dispatch, EVENT_BUFFER_SIZE};

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Nomad event stream processor
#[derive(Parser, Debug)]
#[command(name = "nomad-events")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Validate configuration and exit
    #[arg(long)]
    validate_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (text, json)
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format)?;

    if cli.validate_config {
        return validate_config(&cli.config);
    }

    run(cli).await
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true))
                .with(filter)
                .init();
        }
    }

    Ok(())
}

/// Load and fully compile the configuration, then report and exit
fn validate_config(path: &PathBuf) -> anyhow::Result<()> {
    let config = Config::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    Router::compile(&config.routes).context("invalid routing configuration")?;
    Registry::build(&config.outputs, None).context("invalid output configuration")?;

    println!("configuration is valid");
    println!("  config file:   {}", path.display());
    println!("  nomad address: {}", config.nomad.address);
    println!("  outputs:       {}", config.outputs.len());
    println!("  routes:        {}", config.routes.len());
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    tracing::info!(
        nomad_address = %config.nomad.address,
        config_path = %cli.config.display(),
        "starting nomad-events"
    );

    let client = Arc::new(Client::new(&config.nomad).context("failed to create nomad client")?);
    let service = Arc::new(
        ServiceManager::new(&cli.config, Some(Arc::clone(&client)))
            .context("failed to load initial configuration")?,
    );

    let cancel = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER_SIZE);

    let ingest = tokio::spawn(EventStream::new(client).run(cancel.clone(), events_tx));
    let dispatcher = tokio::spawn(dispatch::run(events_rx, Arc::clone(&service)));

    tracing::info!(event_buffer_size = EVENT_BUFFER_SIZE, "service started");

    wait_for_signals(&service).await?;

    // Cancel ingest; its sender drops, the dispatcher drains and exits
    tracing::info!("initiating graceful shutdown");
    cancel.cancel();

    let drained = tokio::time::timeout(SHUTDOWN_DEADLINE, async {
        let _ = ingest.await;
        let _ = dispatcher.await;
    })
    .await;

    match drained {
        Ok(()) => tracing::info!("graceful shutdown complete"),
        Err(_) => tracing::warn!(
            deadline_secs = SHUTDOWN_DEADLINE.as_secs(),
            "shutdown deadline exceeded, forcing exit"
        ),
    }
    Ok(())
}

/// Block on signals: SIGHUP reloads, SIGINT/SIGTERM return to shut down
async fn wait_for_signals(service: &Arc<ServiceManager>) -> anyhow::Result<()> {
    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                tracing::info!("SIGHUP received, reloading configuration");
                if let Err(error) = service.reload() {
                    // Keep running on the previous configuration
                    tracing::error!(
                        error = %error,
                        "configuration reload failed, continuing with current config"
                    );
                }
            }
            _ = interrupt.recv() => {
                tracing::info!("SIGINT received");
                return Ok(());
            }
            _ = terminate.recv() => {
                tracing::info!("SIGTERM received");
                return Ok(());
            }
        }
    }
}
