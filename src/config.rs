//! Configuration types for model-harvest
//!
//! Every value the tool needs lives in [`Config`]; nothing is read from globals. The
//! configuration is loaded once (usually from a JSON file), validated once, and then
//! shared read-only by the acquisition loop, the slicing batch and the report.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default model API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.thingiverse.com";

/// Default size ceiling for a single downloaded file (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Main configuration
///
/// Fields are organized into sub-configs, one per concern:
/// - [`api`](ApiConfig) - remote API location and credentials
/// - [`scan`](ScanConfig) - which candidate ids to visit
/// - [`storage`](StorageConfig) - where and how artifacts are written
/// - [`retry`](RetryConfig) - transfer retry policy
/// - [`slicing`](SlicingConfig) - slicer batch job
/// - [`report`](ReportConfig) - G-code command report
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Candidate id range
    #[serde(default)]
    pub scan: ScanConfig,

    /// Output layout and file filtering
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry policy for file transfers
    #[serde(default)]
    pub retry: RetryConfig,

    /// Slicer batch settings
    #[serde(default)]
    pub slicing: SlicingConfig,

    /// Command report settings
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    ///
    /// Missing sections and fields fall back to their defaults. The result is not
    /// validated; call [`Config::validate`] (or let the component entry point do it).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Validate everything the acquisition loop depends on
    ///
    /// Checks the API, scan, storage and retry sections. The slicing and report
    /// sections are validated by their own entry points, so a configuration used only
    /// for reporting does not need an API token.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.scan.validate()?;
        self.storage.validate()?;
        self.retry.validate()
    }
}

/// Remote model API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL (default: "https://api.thingiverse.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent in the `Authorization` header of every request
    #[serde(default)]
    pub token: String,

    /// Per-request timeout (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Reject an empty token and base URLs that are not absolute http(s) URLs
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::config("api.token", "API token must not be empty"));
        }

        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::config(
                "api.base_url",
                format!("invalid base URL '{}': {}", self.base_url, e),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(
                "api.base_url",
                format!("base URL must be http or https, got '{}'", url.scheme()),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::config(
                "api.request_timeout",
                "request timeout must be positive",
            ));
        }
        Ok(())
    }
}

/// Candidate id range configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// First candidate id to visit (default: 1)
    #[serde(default = "default_start_id")]
    pub start_id: u64,

    /// Number of consecutive ids to visit (default: 10000)
    #[serde(default = "default_max_items")]
    pub max_items: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            start_id: default_start_id(),
            max_items: default_max_items(),
        }
    }
}

impl ScanConfig {
    /// Require a non-empty range whose end fits in a `u64`
    pub fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            return Err(Error::config(
                "scan.max_items",
                "candidate count must be positive",
            ));
        }
        if self.start_id.checked_add(self.max_items).is_none() {
            return Err(Error::config(
                "scan.max_items",
                format!(
                    "range starting at {} with {} items overflows",
                    self.start_id, self.max_items
                ),
            ));
        }
        Ok(())
    }
}

/// How G-code descriptors of one candidate map to local paths
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcodeNaming {
    /// All G-code files share `model_<id>.<ext>`; later files overwrite earlier ones (default)
    #[default]
    Shared,
    /// First file is `model_<id>.<ext>`, the n-th is `model_<id>_<n>.<ext>`
    Indexed,
}

/// Output layout and file filtering
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving mesh files (default: "models/stl")
    #[serde(default = "default_mesh_dir")]
    pub mesh_dir: PathBuf,

    /// Directory receiving G-code files (default: "models/gcode")
    #[serde(default = "default_gcode_dir")]
    pub gcode_dir: PathBuf,

    /// Files whose reported size is not strictly below this are skipped (default: 100 MiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Mesh file extension without the dot (default: "stl")
    #[serde(default = "default_mesh_extension")]
    pub mesh_extension: String,

    /// G-code file extension without the dot (default: "gcode")
    #[serde(default = "default_gcode_extension")]
    pub gcode_extension: String,

    /// G-code destination naming policy
    #[serde(default)]
    pub gcode_naming: GcodeNaming,

    /// Where to write the list of unresolved candidates after a run (None = don't write)
    #[serde(default)]
    pub unresolved_manifest: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mesh_dir: default_mesh_dir(),
            gcode_dir: default_gcode_dir(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            mesh_extension: default_mesh_extension(),
            gcode_extension: default_gcode_extension(),
            gcode_naming: GcodeNaming::default(),
            unresolved_manifest: None,
        }
    }
}

impl StorageConfig {
    /// Check directories, the size ceiling and the extensions
    pub fn validate(&self) -> Result<()> {
        if self.mesh_dir.as_os_str().is_empty() {
            return Err(Error::config(
                "storage.mesh_dir",
                "mesh directory must be set",
            ));
        }
        if self.gcode_dir.as_os_str().is_empty() {
            return Err(Error::config(
                "storage.gcode_dir",
                "G-code directory must be set",
            ));
        }
        if self.max_file_size == 0 {
            return Err(Error::config(
                "storage.max_file_size",
                "size ceiling must be positive",
            ));
        }
        validate_extension("storage.mesh_extension", &self.mesh_extension)?;
        validate_extension("storage.gcode_extension", &self.gcode_extension)?;
        if self.mesh_extension == self.gcode_extension {
            return Err(Error::config(
                "storage.gcode_extension",
                "mesh and G-code extensions must differ",
            ));
        }
        Ok(())
    }

    /// Deterministic mesh path for a candidate: `<mesh_dir>/model_<id>.<mesh_ext>`
    pub fn mesh_path(&self, id: u64) -> PathBuf {
        self.mesh_dir
            .join(format!("model_{}.{}", id, self.mesh_extension))
    }

    /// Deterministic G-code path for a candidate
    ///
    /// `index` is the 0-based position of the descriptor among the candidate's
    /// qualifying G-code descriptors. It only affects the name under
    /// [`GcodeNaming::Indexed`], and index 0 always maps to the shared name.
    pub fn gcode_path(&self, id: u64, index: usize) -> PathBuf {
        let name = match self.gcode_naming {
            GcodeNaming::Indexed if index > 0 => {
                format!("model_{}_{}.{}", id, index + 1, self.gcode_extension)
            }
            _ => format!("model_{}.{}", id, self.gcode_extension),
        };
        self.gcode_dir.join(name)
    }
}

/// Retry configuration for file transfers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after the first failed attempt (default: 1000 ms)
    #[serde(default = "default_retry_delay", with = "millis_serde")]
    pub delay: Duration,

    /// Upper bound for any single pause (default: 60000 ms)
    #[serde(default = "default_max_delay", with = "millis_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the pause after each failure (default: 1.0 = fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to pauses (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Require at least one attempt and a finite multiplier of at least 1.0
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config(
                "retry.max_attempts",
                "at least one attempt is required",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                format!(
                    "backoff multiplier must be a finite number >= 1.0, got {}",
                    self.backoff_multiplier
                ),
            ));
        }
        Ok(())
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename
    Rename,
    /// Overwrite existing file (default)
    #[default]
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

/// One external slicer and the printer profiles it is run with
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlicerProfile {
    /// Short name, used as the first output sub-directory (e.g. "prusaslicer")
    pub name: String,

    /// Slicer executable: an existing path, or a program name looked up on PATH
    pub executable: PathBuf,

    /// Flag that precedes each configuration file (default: "--load")
    #[serde(default = "default_config_flag")]
    pub config_flag: String,

    /// Arguments placed before the configuration flag (e.g. ["--export-gcode"])
    #[serde(default)]
    pub leading_args: Vec<String>,

    /// Printer configuration files; each one produces its own output directory
    #[serde(default)]
    pub configs: Vec<PathBuf>,
}

/// Slicer batch configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlicingConfig {
    /// Directory scanned for mesh files (default: "models/stl")
    #[serde(default = "default_mesh_dir")]
    pub input_dir: PathBuf,

    /// Root of the `<slicer>/<config>/` output tree (default: "sliced")
    #[serde(default = "default_sliced_dir")]
    pub output_dir: PathBuf,

    /// Meshes are moved here once every profile has been tried (default: "models/completed")
    #[serde(default = "default_completed_dir")]
    pub completed_dir: PathBuf,

    /// Mesh file extension without the dot (default: "stl")
    #[serde(default = "default_mesh_extension")]
    pub mesh_extension: String,

    /// G-code file extension written by the slicers (default: "gcode")
    #[serde(default = "default_gcode_extension")]
    pub gcode_extension: String,

    /// Slicers to run
    #[serde(default)]
    pub profiles: Vec<SlicerProfile>,

    /// Pause between passes when draining the input directory (default: 60 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// What to do when a mesh with the same name is already in `completed_dir`
    #[serde(default)]
    pub on_collision: FileCollisionAction,
}

impl Default for SlicingConfig {
    fn default() -> Self {
        Self {
            input_dir: default_mesh_dir(),
            output_dir: default_sliced_dir(),
            completed_dir: default_completed_dir(),
            mesh_extension: default_mesh_extension(),
            gcode_extension: default_gcode_extension(),
            profiles: Vec::new(),
            poll_interval: default_poll_interval(),
            on_collision: FileCollisionAction::default(),
        }
    }
}

impl SlicingConfig {
    /// Require at least one named profile and usable extensions
    pub fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            return Err(Error::config(
                "slicing.profiles",
                "at least one slicer profile is required",
            ));
        }
        for (i, profile) in self.profiles.iter().enumerate() {
            if profile.name.trim().is_empty() {
                return Err(Error::config(
                    format!("slicing.profiles[{i}].name"),
                    "profile name must not be empty",
                ));
            }
            if profile.executable.as_os_str().is_empty() {
                return Err(Error::config(
                    format!("slicing.profiles[{i}].executable"),
                    "executable must be set",
                ));
            }
        }
        validate_extension("slicing.mesh_extension", &self.mesh_extension)?;
        validate_extension("slicing.gcode_extension", &self.gcode_extension)
    }
}

/// G-code command report configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Root of the `<slicer>/<printer>/` tree to scan (default: "sliced")
    #[serde(default = "default_sliced_dir")]
    pub gcode_root: PathBuf,

    /// Extension of the files to tally (default: "gcode")
    #[serde(default = "default_gcode_extension")]
    pub extension: String,

    /// CSV output path (default: "gcode_commands.csv")
    #[serde(default = "default_report_output")]
    pub output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            gcode_root: default_sliced_dir(),
            extension: default_gcode_extension(),
            output: default_report_output(),
        }
    }
}

impl ReportConfig {
    /// Require a usable extension and an output path
    pub fn validate(&self) -> Result<()> {
        validate_extension("report.extension", &self.extension)?;
        if self.output.as_os_str().is_empty() {
            return Err(Error::config("report.output", "output path must be set"));
        }
        Ok(())
    }
}

fn validate_extension(key: &str, ext: &str) -> Result<()> {
    if ext.is_empty() {
        return Err(Error::config(key, "extension must not be empty"));
    }
    if ext.starts_with('.') || ext.contains(['/', '\\']) {
        return Err(Error::config(
            key,
            format!("extension '{ext}' must be given without a dot or separators"),
        ));
    }
    Ok(())
}

// Default value functions
fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    format!("model-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_start_id() -> u64 {
    1
}

fn default_max_items() -> u64 {
    10_000
}

fn default_mesh_dir() -> PathBuf {
    PathBuf::from("models/stl")
}

fn default_gcode_dir() -> PathBuf {
    PathBuf::from("models/gcode")
}

fn default_completed_dir() -> PathBuf {
    PathBuf::from("models/completed")
}

fn default_sliced_dir() -> PathBuf {
    PathBuf::from("sliced")
}

fn default_report_output() -> PathBuf {
    PathBuf::from("gcode_commands.csv")
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_mesh_extension() -> String {
    "stl".into()
}

fn default_gcode_extension() -> String {
    "gcode".into()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_config_flag() -> String {
    "--load".into()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper (retry pauses)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
