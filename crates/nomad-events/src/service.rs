//! Hot-reloadable routing and delivery state
//!
//! The router and sink registry are the only shared mutable state in the
//! process, guarded by one readers-writer lock over two `Arc`s. Dispatchers
//! take the read lock just long enough to snapshot the pair, then route and
//! deliver against their snapshot without holding anything. Reload builds a
//! complete replacement first and swaps under the write lock, so a failed
//! reload leaves the live configuration untouched.
//!
//! An event in flight at the moment of the swap completes against whichever
//! snapshot it took; an event picked up afterwards always sees the new
//! configuration.

use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Context;

use nev_config::Config;
use nev_event::Event;
use nev_nomad::Client;
use nev_routing::Router;
use nev_sinks::{Registry, SinkError};

/// The pair of pointers one dispatch works against
#[derive(Clone)]
struct Snapshot {
    router: Arc<Router>,
    sinks: Arc<Registry>,
}

/// Owns the active configuration generation
pub struct ServiceManager {
    config_path: PathBuf,
    client: Option<Arc<Client>>,
    state: RwLock<Snapshot>,
}

impl ServiceManager {
    /// Load the initial configuration and build the first generation
    ///
    /// # Errors
    ///
    /// Fails when the config does not load, a filter does not compile, or a
    /// sink cannot be constructed; startup aborts on any of these.
    pub fn new(
        config_path: impl Into<PathBuf>,
        client: Option<Arc<Client>>,
    ) -> anyhow::Result<Self> {
        let config_path = config_path.into();
        let snapshot = build_snapshot(&config_path, client.as_ref())?;

        Ok(Self {
            config_path,
            client,
            state: RwLock::new(snapshot),
        })
    }

    /// Re-read the configuration and atomically swap in the new generation
    ///
    /// # Errors
    ///
    /// Any failure (parse, validation, compile, sink construction) leaves
    /// the running configuration in place.
    pub fn reload(&self) -> anyhow::Result<()> {
        tracing::info!(config_path = %self.config_path.display(), "reloading configuration");

        let snapshot = build_snapshot(&self.config_path, self.client.as_ref())?;

        *write_lock(&self.state) = snapshot;

        tracing::info!("configuration reload complete");
        Ok(())
    }

    /// Route an event through the current router
    pub fn route(&self, event: &Event) -> Vec<String> {
        let router = Arc::clone(&read_lock(&self.state).router);
        router.route(event)
    }

    /// Deliver an event to one output of the current registry
    ///
    /// The read lock is released before any sink I/O happens.
    pub async fn send(&self, output: &str, event: &Event) -> Result<(), SinkError> {
        let sinks = Arc::clone(&read_lock(&self.state).sinks);
        sinks.send(output, event).await
    }
}

/// Build a complete generation from the config file
fn build_snapshot(path: &PathBuf, client: Option<&Arc<Client>>) -> anyhow::Result<Snapshot> {
    let config = Config::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    let router = Router::compile(&config.routes).context("failed to compile routes")?;
    let registry =
        Registry::build(&config.outputs, client.cloned()).context("failed to build outputs")?;

    tracing::info!(
        outputs = config.outputs.len(),
        routes = config.routes.len(),
        "configuration loaded"
    );
    Ok(Snapshot {
        router: Arc::new(router),
        sinks: Arc::new(registry),
    })
}

/// Read-lock that shrugs off poisoning: a panicked writer left no partial
/// state because swaps are whole-value assignments
fn read_lock(lock: &RwLock<Snapshot>) -> RwLockReadGuard<'_, Snapshot> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock(lock: &RwLock<Snapshot>) -> RwLockWriteGuard<'_, Snapshot> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
