//! Core types for model-harvest

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Remote identifier of a candidate model ("thing")
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThingId(pub u64);

impl ThingId {
    /// Create a new ThingId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ThingId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ThingId> for u64 {
    fn from(id: ThingId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ThingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ThingId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Metadata returned by `GET /things/{id}`
///
/// Only the two accessibility flags are read; absent flags count as `false`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingInfo {
    /// The model is private to its owner
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_private: bool,
    /// The model is a paid download
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_purchased: bool,
}

/// One entry of `GET /things/{id}/files`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File name as uploaded, including its extension; empty when the API sent
    /// null or a non-string
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Size in bytes; `None` when the API sent null, a non-integer, or nothing at all
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
    /// Direct download URL; empty when the API sent null or a non-string
    #[serde(default, deserialize_with = "lenient_string")]
    pub download_url: String,
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}

// A malformed entry must not fail the whole manifest; an empty value never qualifies
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    // Anything truthy counts as set, so odd payloads fail closed
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_none_or(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    })
}

/// Kind of local artifact
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Mesh file (e.g. STL)
    Mesh,
    /// Sliced G-code
    Gcode,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Mesh => write!(f, "mesh"),
            ArtifactKind::Gcode => write!(f, "gcode"),
        }
    }
}

/// Result of the accessibility lookup for one candidate
///
/// `CheckFailed` is kept apart from `Ineligible` so callers can tell a verified
/// private/paid model from one whose lookup failed. Both suppress the candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessibilityVerdict {
    /// Public and free
    Eligible,
    /// The API reported the model as private and/or purchased
    Ineligible {
        /// Value of `is_private`
        is_private: bool,
        /// Value of `is_purchased`
        is_purchased: bool,
    },
    /// The lookup itself failed; treated as not accessible
    CheckFailed(String),
}

impl AccessibilityVerdict {
    /// Whether the candidate may be downloaded
    pub fn is_eligible(&self) -> bool {
        matches!(self, AccessibilityVerdict::Eligible)
    }
}

/// Why a candidate was given up before any transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbandonReason {
    /// The file manifest could not be fetched or decoded
    ManifestUnavailable {
        /// Error message
        error: String,
    },
}

impl std::fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbandonReason::ManifestUnavailable { error } => {
                write!(f, "file manifest unavailable: {}", error)
            }
        }
    }
}

/// A transfer that exhausted its attempts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTransfer {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Source URL
    pub url: String,
    /// Destination that was not written
    pub destination: PathBuf,
    /// Attempts made
    pub attempts: u32,
    /// Error of the last attempt
    pub error: String,
}

/// Final state of one candidate after a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// Verified private and/or purchased
    Ineligible {
        /// Value of `is_private`
        is_private: bool,
        /// Value of `is_purchased`
        is_purchased: bool,
    },
    /// Accessibility lookup failed; candidate suppressed for this run
    CheckFailed {
        /// Error message
        error: String,
    },
    /// An artifact already exists locally; nothing was requested
    Skipped {
        /// The existing artifact
        existing: PathBuf,
    },
    /// Given up before any transfer
    Abandoned {
        /// Why
        reason: AbandonReason,
    },
    /// The manifest had no file passing the extension and size checks
    NoQualifyingFiles,
    /// Every planned transfer succeeded
    Fetched {
        /// Files written
        files: Vec<PathBuf>,
    },
    /// Some transfers succeeded, some exhausted their attempts
    PartiallyFetched {
        /// Files written
        files: Vec<PathBuf>,
        /// Transfers that failed
        failed: Vec<FailedTransfer>,
    },
    /// Every planned transfer exhausted its attempts
    FetchFailed {
        /// Transfers that failed
        failed: Vec<FailedTransfer>,
    },
}

impl CandidateOutcome {
    /// Whether the candidate still needs attention (a later run may complete it)
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            CandidateOutcome::CheckFailed { .. }
                | CandidateOutcome::Abandoned { .. }
                | CandidateOutcome::PartiallyFetched { .. }
                | CandidateOutcome::FetchFailed { .. }
        )
    }

    /// Files written while processing the candidate
    pub fn files_written(&self) -> &[PathBuf] {
        match self {
            CandidateOutcome::Fetched { files } | CandidateOutcome::PartiallyFetched { files, .. } => {
                files
            }
            _ => &[],
        }
    }

    /// Short state label for logs
    pub fn label(&self) -> &'static str {
        match self {
            CandidateOutcome::Ineligible { .. } => "ineligible",
            CandidateOutcome::CheckFailed { .. } => "check_failed",
            CandidateOutcome::Skipped { .. } => "skipped",
            CandidateOutcome::Abandoned { .. } => "abandoned",
            CandidateOutcome::NoQualifyingFiles => "no_qualifying_files",
            CandidateOutcome::Fetched { .. } => "fetched",
            CandidateOutcome::PartiallyFetched { .. } => "partially_fetched",
            CandidateOutcome::FetchFailed { .. } => "fetch_failed",
        }
    }
}

/// Result of one file transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The file is on disk at `path`
    Written {
        /// Destination path
        path: PathBuf,
        /// Bytes written
        bytes: u64,
        /// Attempts made, including the successful one
        attempts: u32,
    },
    /// Every attempt failed; nothing was written
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the last attempt
        error: String,
    },
}

/// Events emitted by the harvester
///
/// Subscribe with [`Harvester::subscribe`](crate::Harvester::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A file was written
    FileSaved {
        /// Candidate id
        id: ThingId,
        /// Artifact kind
        kind: ArtifactKind,
        /// Destination path
        path: PathBuf,
        /// Bytes written
        bytes: u64,
        /// Attempts it took
        attempts: u32,
    },

    /// A transfer exhausted its attempts
    TransferFailed {
        /// Candidate id
        id: ThingId,
        /// Artifact kind
        kind: ArtifactKind,
        /// Source URL
        url: String,
        /// Attempts made
        attempts: u32,
        /// Error of the last attempt
        error: String,
    },

    /// A candidate reached its final state
    CandidateFinished {
        /// Candidate id
        id: ThingId,
        /// Final state
        outcome: CandidateOutcome,
    },

    /// The whole range has been scanned
    RunComplete {
        /// Candidates visited
        scanned: u64,
        /// Files written during the run
        files_written: usize,
        /// Candidates left unresolved
        unresolved: usize,
    },
}
