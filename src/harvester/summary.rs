//! Run summary and the unresolved-candidate manifest

use crate::error::{Error, Result};
use crate::types::{CandidateOutcome, ThingId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of every candidate visited by a run, in visiting order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// First id of the range
    pub start: u64,
    /// One past the last id of the range
    pub end: u64,
    /// Per-candidate outcomes
    pub outcomes: Vec<(ThingId, CandidateOutcome)>,
}

impl RunSummary {
    /// Empty summary for `[start, end)`
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            outcomes: Vec::new(),
        }
    }

    /// Record a candidate's outcome
    pub fn record(&mut self, id: ThingId, outcome: CandidateOutcome) {
        self.outcomes.push((id, outcome));
    }

    /// Number of candidates visited
    pub fn scanned(&self) -> u64 {
        self.outcomes.len() as u64
    }

    /// Number of distinct files written
    pub fn files_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| outcome.files_written().len())
            .sum()
    }

    /// Outcome of one candidate
    pub fn outcome(&self, id: ThingId) -> Option<&CandidateOutcome> {
        self.outcomes
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, outcome)| outcome)
    }

    /// Candidates a later run may still complete
    pub fn unresolved(&self) -> impl Iterator<Item = (ThingId, &CandidateOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_unresolved())
            .map(|(id, outcome)| (*id, outcome))
    }

    /// Number of candidates per outcome label
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, outcome) in &self.outcomes {
            *counts.entry(outcome.label()).or_insert(0) += 1;
        }
        counts
    }

    /// Write the unresolved candidates as JSON to `path`
    ///
    /// The parent directory is created if needed. The file is written even when
    /// nothing is unresolved, so its timestamp always reflects the last run.
    pub async fn write_unresolved_manifest(&self, path: &Path) -> Result<()> {
        let manifest = UnresolvedManifest {
            generated_at: Utc::now(),
            range: ScanRange {
                start: self.start,
                end: self.end,
            },
            unresolved: self
                .unresolved()
                .map(|(id, outcome)| UnresolvedEntry { id, outcome })
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&manifest)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_at(parent, e))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| Error::io_at(path, e))?;

        tracing::info!(
            path = %path.display(),
            unresolved = manifest.unresolved.len(),
            "Unresolved candidate manifest written"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct UnresolvedManifest<'a> {
    generated_at: DateTime<Utc>,
    range: ScanRange,
    unresolved: Vec<UnresolvedEntry<'a>>,
}

#[derive(Serialize)]
struct ScanRange {
    start: u64,
    end: u64,
}

#[derive(Serialize)]
struct UnresolvedEntry<'a> {
    id: ThingId,
    outcome: &'a CandidateOutcome,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AbandonReason;
    use std::path::PathBuf;

    fn sample() -> RunSummary {
        let mut summary = RunSummary::new(10, 14);
        summary.record(
            ThingId(10),
            CandidateOutcome::Ineligible {
                is_private: true,
                is_purchased: false,
            },
        );
        summary.record(
            ThingId(11),
            CandidateOutcome::Fetched {
                files: vec![PathBuf::from("a.stl"), PathBuf::from("a.gcode")],
            },
        );
        summary.record(
            ThingId(12),
            CandidateOutcome::Abandoned {
                reason: AbandonReason::ManifestUnavailable {
                    error: "HTTP 500".into(),
                },
            },
        );
        summary.record(
            ThingId(13),
            CandidateOutcome::CheckFailed {
                error: "timeout".into(),
            },
        );
        summary
    }

    #[test]
    fn counts_and_totals() {
        let summary = sample();
        assert_eq!(summary.scanned(), 4);
        assert_eq!(summary.files_written(), 2);

        let counts = summary.counts();
        assert_eq!(counts.get("ineligible"), Some(&1));
        assert_eq!(counts.get("fetched"), Some(&1));
        assert_eq!(counts.get("abandoned"), Some(&1));
        assert_eq!(counts.get("check_failed"), Some(&1));
        assert_eq!(counts.get("skipped"), None);
    }

    #[test]
    fn unresolved_lists_only_candidates_worth_retrying() {
        let summary = sample();
        let ids: Vec<_> = summary.unresolved().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![ThingId(12), ThingId(13)]);
    }

    #[test]
    fn outcome_lookup_by_id() {
        let summary = sample();
        assert!(matches!(
            summary.outcome(ThingId(11)),
            Some(CandidateOutcome::Fetched { .. })
        ));
        assert!(summary.outcome(ThingId(99)).is_none());
    }

    #[tokio::test]
    async fn unresolved_manifest_is_written_as_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("reports").join("unresolved.json");

        sample().write_unresolved_manifest(&path).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["range"]["start"], 10);
        assert_eq!(json["range"]["end"], 14);
        assert!(json["generated_at"].is_string());

        let entries = json["unresolved"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["id"], 12);
        assert_eq!(entries[0]["outcome"]["state"], "abandoned");
        assert_eq!(entries[1]["id"], 13);
        assert_eq!(entries[1]["outcome"]["state"], "check_failed");
    }
}
