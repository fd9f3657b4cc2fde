//! Error types for model-harvest
//!
//! Errors are split along the fail-fast boundary of the tool:
//! - [`FetchError`] covers every remote failure (transport, HTTP status, bad payload).
//!   Remote failures are always local to one candidate or one file and never stop a run.
//! - [`Error`] is the crate-wide error. Its `Io` variant is the fatal boundary: a
//!   directory or file that cannot be created means the environment is misconfigured.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for model-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for model-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage.mesh_dir")
        key: Option<String>,
    },

    /// Local I/O error (directory creation, file open/write, rename)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local I/O error tied to a specific path
    #[error("I/O error at {path}: {source}")]
    IoAt {
        /// The path the operation was working on
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Remote API or transfer failure
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (slicer binaries)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Attach a path to an I/O error
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must terminate the run
    ///
    /// Local filesystem failures are fatal; everything else is handled per candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::IoAt { .. } | Error::Config { .. }
        )
    }
}

/// Remote failures while talking to the model API or a download URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("request to {url} failed: {source}")]
    Network {
        /// URL that was requested
        url: String,
        /// Underlying client error
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// The response body could not be decoded
    #[error("invalid response from {url}: {message}")]
    Decode {
        /// URL that was requested
        url: String,
        /// Decoder message
        message: String,
    },
}

impl FetchError {
    /// URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Network { source, .. } => source.status().map(|s| s.as_u16()),
            FetchError::Decode { .. } => None,
        }
    }
}

/// Errors a failed transfer attempt can produce
///
/// Remote failures are retried; a local failure aborts the transfer immediately and
/// is surfaced as a fatal [`Error`].
#[derive(Debug, Error)]
pub enum TransferError {
    /// Remote failure, eligible for retry
    #[error(transparent)]
    Remote(#[from] FetchError),

    /// Local filesystem failure while writing the destination
    #[error("cannot write {path}: {source}")]
    Local {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl From<TransferError> for Error {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Remote(e) => Error::Fetch(e),
            TransferError::Local { path, source } => Error::IoAt { path, source },
        }
    }
}
