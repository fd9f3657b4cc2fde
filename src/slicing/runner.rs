//! Slicer process execution

use crate::config::SlicerProfile;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT_LEN: usize = 512;

/// One slicer invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceJob {
    /// Profile name, for logs
    pub profile: String,
    /// Resolved executable
    pub executable: PathBuf,
    /// Full argument list
    pub args: Vec<OsString>,
    /// Input mesh
    pub mesh: PathBuf,
    /// G-code file the slicer is told to write
    pub output: PathBuf,
}

impl SliceJob {
    /// Build the invocation `<executable> <leading_args..> <config_flag> <config> -o <output> <mesh>`
    pub fn new(
        profile: &SlicerProfile,
        executable: PathBuf,
        config: &Path,
        mesh: &Path,
        output: &Path,
    ) -> Self {
        let mut args: Vec<OsString> = profile.leading_args.iter().map(OsString::from).collect();
        args.push(OsString::from(&profile.config_flag));
        args.push(config.as_os_str().to_owned());
        args.push(OsString::from("-o"));
        args.push(output.as_os_str().to_owned());
        args.push(mesh.as_os_str().to_owned());

        Self {
            profile: profile.name.clone(),
            executable,
            args,
            mesh: mesh.to_path_buf(),
            output: output.to_path_buf(),
        }
    }
}

/// Runs one slicer invocation to completion
///
/// Implementations must return an error when the slicer could not be started or
/// reported failure. The batch logs and counts such errors; it never stops on them.
#[async_trait]
pub trait SlicerRunner: Send + Sync {
    /// Run the job and wait for it
    async fn slice(&self, job: &SliceJob) -> Result<()>;

    /// Runner name, for logs
    fn name(&self) -> &'static str;
}

/// Runs slicers as child processes
#[derive(Clone, Copy, Debug, Default)]
pub struct CliSlicerRunner;

#[async_trait]
impl SlicerRunner for CliSlicerRunner {
    async fn slice(&self, job: &SliceJob) -> Result<()> {
        let output = Command::new(&job.executable)
            .args(&job.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::ExternalTool(format!(
                    "failed to execute {}: {}",
                    job.executable.display(),
                    e
                ))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_LEN).collect();
        Err(Error::ExternalTool(format!(
            "{} exited with {}: {}",
            job.executable.display(),
            output.status,
            excerpt
        )))
    }

    fn name(&self) -> &'static str {
        "cli"
    }
}

/// Resolve a configured executable
///
/// An existing path is used as is; anything else is looked up on `PATH`.
pub fn resolve_executable(executable: &Path) -> Option<PathBuf> {
    if executable.is_file() {
        return Some(executable.to_path_buf());
    }
    which::which(executable).ok()
}
