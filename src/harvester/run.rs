//! The sequential id-range loop

use super::Harvester;
use super::summary::RunSummary;
use crate::error::{Error, Result};
use crate::types::{Event, ThingId};

impl Harvester {
    /// Scan the configured range `[scan.start_id, scan.start_id + scan.max_items)`
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_range(self.config.scan.start_id, self.config.scan.max_items)
            .await
    }

    /// Scan `[start, start + count)`, one candidate at a time
    ///
    /// Candidates already on disk are skipped, so re-running the same range resumes
    /// where an interrupted run stopped. When `storage.unresolved_manifest` is set, the
    /// list of unresolved candidates is written there at the end.
    ///
    /// # Errors
    ///
    /// Only local filesystem failures end the run early. Every remote failure is
    /// recorded in the summary instead.
    pub async fn run_range(&self, start: u64, count: u64) -> Result<RunSummary> {
        let end = start.checked_add(count).ok_or_else(|| {
            Error::config(
                "scan.max_items",
                format!("range starting at {} with {} items overflows", start, count),
            )
        })?;

        tracing::info!(start, end, "Starting acquisition run");

        let mut summary = RunSummary::new(start, end);
        for raw_id in start..end {
            let id = ThingId::new(raw_id);
            let outcome = self.process_candidate(id).await?;
            summary.record(id, outcome);
        }

        if let Some(path) = &self.config.storage.unresolved_manifest {
            summary.write_unresolved_manifest(path).await?;
        }

        let files_written = summary.files_written();
        let unresolved = summary.unresolved().count();
        tracing::info!(
            scanned = summary.scanned(),
            files_written,
            unresolved,
            "Acquisition run complete"
        );
        self.emit_event(Event::RunComplete {
            scanned: summary.scanned(),
            files_written,
            unresolved,
        });

        Ok(summary)
    }
}
