//! # model-harvest
//!
//! Incremental, resumable acquisition of 3D model files from the Thingiverse API,
//! plus the two batch jobs that consume them: slicing meshes with external slicers
//! and tallying the G-code commands they produce.
//!
//! ## Design Philosophy
//!
//! - **Resumable** - a candidate with an artifact on disk is never fetched again, so an
//!   interrupted run is resumed by running the same range
//! - **Fail-closed** - a model whose accessibility cannot be confirmed is not touched
//! - **Remote failures are local** - one bad candidate or file never stops a run;
//!   only local filesystem failures do
//! - **Event-driven** - consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use model_harvest::{Config, Harvester};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.token = "my-api-token".to_string();
//!     config.scan.start_id = 6190257;
//!     config.scan.max_items = 1000;
//!
//!     let harvester = Harvester::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = harvester.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = harvester.run().await?;
//!     println!("{} files written", summary.files_written());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Thingiverse API client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Acquisition loop (decomposed into focused submodules)
pub mod harvester;
/// G-code command report
pub mod report;
/// Retry logic with fixed or exponential backoff
pub mod retry;
/// Batch slicing with external slicers
pub mod slicing;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use client::ApiClient;
pub use config::{Config, FileCollisionAction, GcodeNaming, SlicerProfile};
pub use error::{Error, FetchError, Result};
pub use harvester::{Harvester, RunSummary};
pub use report::generate_report;
pub use slicing::{CliSlicerRunner, SliceBatch, SliceSummary, SlicerRunner};
pub use types::{
    AbandonReason, AccessibilityVerdict, ArtifactKind, CandidateOutcome, Event, RemoteFile,
    ThingId, ThingInfo, TransferOutcome,
};
