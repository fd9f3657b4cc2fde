//! One candidate from accessibility lookup to final outcome
//!
//! ```text
//! Pending -> Ineligible | CheckFailed
//!         -> Skipped (artifact already on disk)
//!         -> Abandoned (manifest unavailable)
//!         -> NoQualifyingFiles
//!         -> Fetching -> Fetched | PartiallyFetched | FetchFailed
//! ```

use super::Harvester;
use super::selection::plan_transfers;
use crate::error::{FetchError, Result};
use crate::types::{
    AbandonReason, AccessibilityVerdict, CandidateOutcome, Event, FailedTransfer, RemoteFile,
    ThingId, TransferOutcome,
};
use std::path::PathBuf;

impl Harvester {
    /// Process one candidate to completion
    ///
    /// Remote failures are folded into the returned outcome. Only local filesystem
    /// failures are returned as errors, and they are meant to end the run.
    pub async fn process_candidate(&self, id: ThingId) -> Result<CandidateOutcome> {
        let outcome = match self.check_accessibility(id).await {
            AccessibilityVerdict::Eligible => self.acquire(id).await?,
            AccessibilityVerdict::Ineligible {
                is_private,
                is_purchased,
            } => CandidateOutcome::Ineligible {
                is_private,
                is_purchased,
            },
            AccessibilityVerdict::CheckFailed(error) => CandidateOutcome::CheckFailed { error },
        };

        tracing::debug!(thing_id = %id, outcome = outcome.label(), "Candidate finished");
        self.emit_event(Event::CandidateFinished {
            id,
            outcome: outcome.clone(),
        });

        Ok(outcome)
    }

    /// Fetch the file manifest of a candidate
    ///
    /// Failures are logged here; the caller abandons the candidate.
    pub async fn list_files(
        &self,
        id: ThingId,
    ) -> std::result::Result<Vec<RemoteFile>, FetchError> {
        self.client.list_files(id).await.inspect_err(|e| {
            tracing::warn!(thing_id = %id, error = %e, "Failed to get file manifest");
        })
    }

    /// First existing artifact path of a candidate, if any
    ///
    /// Only the mesh path and the first G-code path are checked; either one marks the
    /// candidate as done.
    pub fn existing_artifact(&self, id: ThingId) -> Option<PathBuf> {
        let storage = &self.config.storage;
        [storage.mesh_path(id.get()), storage.gcode_path(id.get(), 0)]
            .into_iter()
            .find(|path| path.exists())
    }

    /// Fetch the qualifying files of one manifest
    ///
    /// Transfers run in manifest order. A transfer that exhausts its attempts is
    /// recorded and the next one starts; nothing is re-attempted afterwards.
    pub async fn select_and_fetch(
        &self,
        id: ThingId,
        files: &[RemoteFile],
    ) -> Result<CandidateOutcome> {
        let plan = plan_transfers(id, files, &self.config.storage);
        if plan.is_empty() {
            tracing::debug!(
                thing_id = %id,
                descriptors = files.len(),
                "No file passed the extension and size checks"
            );
            return Ok(CandidateOutcome::NoQualifyingFiles);
        }

        let mut written: Vec<PathBuf> = Vec::new();
        let mut failed: Vec<FailedTransfer> = Vec::new();

        for transfer in plan {
            match self.fetch_to_path(&transfer.url, &transfer.destination).await? {
                TransferOutcome::Written {
                    path,
                    bytes,
                    attempts,
                } => {
                    tracing::info!(
                        thing_id = %id,
                        kind = %transfer.kind,
                        path = %path.display(),
                        bytes,
                        "File saved"
                    );
                    self.emit_event(Event::FileSaved {
                        id,
                        kind: transfer.kind,
                        path: path.clone(),
                        bytes,
                        attempts,
                    });
                    if !written.contains(&path) {
                        written.push(path);
                    }
                }
                TransferOutcome::Exhausted { attempts, error } => {
                    self.emit_event(Event::TransferFailed {
                        id,
                        kind: transfer.kind,
                        url: transfer.url.clone(),
                        attempts,
                        error: error.clone(),
                    });
                    failed.push(FailedTransfer {
                        kind: transfer.kind,
                        url: transfer.url,
                        destination: transfer.destination,
                        attempts,
                        error,
                    });
                }
            }
        }

        Ok(match (written.is_empty(), failed.is_empty()) {
            (_, true) => CandidateOutcome::Fetched { files: written },
            (true, false) => CandidateOutcome::FetchFailed { failed },
            (false, false) => CandidateOutcome::PartiallyFetched {
                files: written,
                failed,
            },
        })
    }

    /// Eligible candidate: skip check, manifest, transfers
    async fn acquire(&self, id: ThingId) -> Result<CandidateOutcome> {
        if let Some(existing) = self.existing_artifact(id) {
            tracing::info!(
                thing_id = %id,
                existing = %existing.display(),
                "Model files already exist, skipping download"
            );
            return Ok(CandidateOutcome::Skipped { existing });
        }

        let files = match self.list_files(id).await {
            Ok(files) => files,
            Err(e) => {
                return Ok(CandidateOutcome::Abandoned {
                    reason: AbandonReason::ManifestUnavailable {
                        error: e.to_string(),
                    },
                });
            }
        };

        self.select_and_fetch(id, &files).await
    }
}
