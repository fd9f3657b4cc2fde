//! Acquisition loop split into focused submodules.
//!
//! The `Harvester` struct and its methods are organized by step:
//! - [`accessibility`] - Public/free check per candidate (fail-closed)
//! - [`candidate`] - One candidate from lookup to final outcome
//! - [`selection`] - Which manifest entries are fetched, and where they go
//! - [`transfer`] - Single file transfer under the retry policy
//! - [`run`] - The sequential id-range loop
//! - [`summary`] - Run summary and unresolved-candidate manifest
//!
//! Everything runs strictly in sequence: one candidate is finished before the next
//! starts, and one transfer is finished (written or exhausted) before the next begins.

mod accessibility;
mod candidate;
pub mod selection;
mod run;
pub mod summary;
mod transfer;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use selection::{PlannedTransfer, plan_transfers};
pub use summary::RunSummary;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event channel; slow subscribers lag rather than block the loop
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Incremental, resumable acquisition of model files
///
/// # Example
///
/// ```no_run
/// use model_harvest::{Config, Harvester};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::default();
/// config.api.token = "my-api-token".into();
/// config.scan.start_id = 6190257;
/// config.scan.max_items = 100;
///
/// let harvester = Harvester::new(config).await?;
/// let summary = harvester.run().await?;
/// println!("{} files written", summary.files_written());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Harvester {
    /// Validated configuration
    pub(crate) config: Arc<Config>,
    /// Shared HTTP client (one connection pool for the whole run)
    pub(crate) client: ApiClient,
    /// Event broadcaster
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl Harvester {
    /// Validate the configuration, create both output directories and build the client
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if validation fails
    /// - [`Error::IoAt`] if an output directory cannot be created
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        for dir in [&config.storage.mesh_dir, &config.storage.gcode_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::io_at(dir, e))?;
        }

        let client = ApiClient::new(&config.api)?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::debug!(
            mesh_dir = %config.storage.mesh_dir.display(),
            gcode_dir = %config.storage.gcode_dir.display(),
            base_url = %config.api.base_url,
            "Harvester initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            client,
            event_tx,
        })
    }

    /// Subscribe to harvester events
    ///
    /// Receivers created after an event was sent do not see it.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this harvester runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send an event to all subscribers; having none is fine
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
