//! Slicing passes over the input directory

use super::runner::{CliSlicerRunner, SliceJob, SlicerRunner, resolve_executable};
use crate::config::{SlicerProfile, SlicingConfig};
use crate::error::{Error, Result};
use crate::utils::{list_files_with_extension, move_into_dir};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counters for one or more slicing passes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SliceSummary {
    /// Meshes found in the input directory
    pub meshes: usize,
    /// G-code files produced
    pub generated: usize,
    /// Outputs that already existed
    pub skipped: usize,
    /// Slicer runs that failed to start or exited non-zero
    pub failed: usize,
    /// Stems of the meshes moved to the completed directory
    pub completed_models: Vec<String>,
}

impl SliceSummary {
    /// Add another pass's counters to this one
    pub fn merge(&mut self, other: SliceSummary) {
        self.meshes += other.meshes;
        self.generated += other.generated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.completed_models.extend(other.completed_models);
    }
}

/// Runs every configured slicer profile over the meshes in the input directory
pub struct SliceBatch {
    config: SlicingConfig,
    runner: Arc<dyn SlicerRunner>,
}

impl SliceBatch {
    /// Batch that runs slicers as child processes
    pub fn new(config: SlicingConfig) -> Result<Self> {
        Self::with_runner(config, Arc::new(CliSlicerRunner))
    }

    /// Batch with a custom runner
    pub fn with_runner(config: SlicingConfig, runner: Arc<dyn SlicerRunner>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// One pass: slice every mesh currently in the input directory, then move them out
    ///
    /// # Errors
    ///
    /// Only local filesystem failures are returned. Slicer failures are counted in
    /// [`SliceSummary::failed`].
    pub async fn run_once(&self) -> Result<SliceSummary> {
        let config = &self.config;
        tokio::fs::create_dir_all(&config.input_dir)
            .await
            .map_err(|e| Error::io_at(&config.input_dir, e))?;

        let meshes = list_files_with_extension(&config.input_dir, &config.mesh_extension).await?;
        let mut summary = SliceSummary {
            meshes: meshes.len(),
            ..Default::default()
        };
        if meshes.is_empty() {
            return Ok(summary);
        }

        let profiles = self.resolved_profiles();
        tracing::info!(
            meshes = meshes.len(),
            profiles = profiles.len(),
            runner = self.runner.name(),
            "Starting slicing pass"
        );

        for mesh in &meshes {
            for (profile, executable) in &profiles {
                self.slice_with_profile(mesh, profile, executable, &mut summary)
                    .await?;
            }
        }

        for mesh in &meshes {
            if move_into_dir(mesh, &config.completed_dir, config.on_collision)
                .await?
                .is_some()
            {
                summary.completed_models.push(file_stem(mesh));
            }
        }

        tracing::info!(
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            completed = summary.completed_models.len(),
            "Slicing pass complete"
        );
        Ok(summary)
    }

    /// Repeat [`run_once`](Self::run_once) until the input directory holds no meshes
    ///
    /// Passes are separated by `poll_interval`, so meshes that arrive in the meantime
    /// are picked up. Stops early when a pass could not move any mesh out of the input
    /// directory, since the next pass would see the same files.
    pub async fn run_until_empty(&self) -> Result<SliceSummary> {
        let mut total = SliceSummary::default();
        loop {
            let pass = self.run_once().await?;
            let (meshes, moved) = (pass.meshes, pass.completed_models.len());
            total.merge(pass);

            if meshes == 0 {
                tracing::info!("All meshes have been processed");
                break;
            }
            if moved == 0 {
                tracing::warn!(
                    input_dir = %self.config.input_dir.display(),
                    "No mesh could be moved to the completed directory, stopping"
                );
                break;
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        tracing::info!(
            generated = total.generated,
            completed = total.completed_models.len(),
            "Slicing finished"
        );
        Ok(total)
    }

    /// Profiles whose executable can be found
    fn resolved_profiles(&self) -> Vec<(&SlicerProfile, PathBuf)> {
        self.config
            .profiles
            .iter()
            .filter_map(|profile| match resolve_executable(&profile.executable) {
                Some(executable) => Some((profile, executable)),
                None => {
                    tracing::warn!(
                        profile = %profile.name,
                        executable = %profile.executable.display(),
                        "Slicer executable not found, skipping profile"
                    );
                    None
                }
            })
            .collect()
    }

    async fn slice_with_profile(
        &self,
        mesh: &Path,
        profile: &SlicerProfile,
        executable: &Path,
        summary: &mut SliceSummary,
    ) -> Result<()> {
        let stem = file_stem(mesh);

        for config_file in &profile.configs {
            if !config_file.exists() {
                tracing::warn!(
                    profile = %profile.name,
                    config = %config_file.display(),
                    "Config file not found, skipping"
                );
                continue;
            }

            let out_dir = self
                .config
                .output_dir
                .join(&profile.name)
                .join(file_stem(config_file));
            tokio::fs::create_dir_all(&out_dir)
                .await
                .map_err(|e| Error::io_at(&out_dir, e))?;

            let output = out_dir.join(format!("{}.{}", stem, self.config.gcode_extension));
            if output.exists() {
                tracing::debug!(output = %output.display(), "G-code already exists, skipping");
                summary.skipped += 1;
                continue;
            }

            let job = SliceJob::new(
                profile,
                executable.to_path_buf(),
                config_file,
                mesh,
                &output,
            );
            match self.runner.slice(&job).await {
                Ok(()) => {
                    tracing::info!(
                        profile = %profile.name,
                        output = %output.display(),
                        "G-code generated"
                    );
                    summary.generated += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        profile = %profile.name,
                        mesh = %mesh.display(),
                        error = %e,
                        "Failed to generate G-code"
                    );
                    summary.failed += 1;
                }
            }
        }
        Ok(())
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileCollisionAction;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes the output file unless the mesh name contains "broken"
    #[derive(Default)]
    struct RecordingRunner {
        jobs: Mutex<Vec<SliceJob>>,
    }

    #[async_trait]
    impl SlicerRunner for RecordingRunner {
        async fn slice(&self, job: &SliceJob) -> Result<()> {
            self.jobs.lock().unwrap().push(job.clone());
            if job.mesh.to_string_lossy().contains("broken") {
                return Err(Error::ExternalTool("slicer crashed".into()));
            }
            fs::write(&job.output, b"G28\n").unwrap();
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Fixture {
        temp_dir: TempDir,
        config: SlicingConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let root = temp_dir.path();
            let exe = root.join("bin").join("fake-slicer");
            fs::create_dir_all(exe.parent().unwrap()).unwrap();
            fs::write(&exe, b"").unwrap();

            let configs_dir = root.join("configs");
            fs::create_dir_all(&configs_dir).unwrap();
            for name in ["printer1.ini", "printer2.ini"] {
                fs::write(configs_dir.join(name), b"").unwrap();
            }

            let config = SlicingConfig {
                input_dir: root.join("stl"),
                output_dir: root.join("sliced"),
                completed_dir: root.join("completed"),
                profiles: vec![SlicerProfile {
                    name: "cura".into(),
                    executable: exe,
                    config_flag: "--load".into(),
                    leading_args: vec![],
                    configs: vec![
                        configs_dir.join("printer1.ini"),
                        configs_dir.join("printer2.ini"),
                    ],
                }],
                poll_interval: Duration::from_millis(10),
                ..Default::default()
            };
            fs::create_dir_all(&config.input_dir).unwrap();

            Self { temp_dir, config }
        }

        fn add_mesh(&self, name: &str) {
            fs::write(self.config.input_dir.join(name), b"solid").unwrap();
        }

        fn batch(&self) -> (SliceBatch, Arc<RecordingRunner>) {
            let runner = Arc::new(RecordingRunner::default());
            let batch = SliceBatch::with_runner(self.config.clone(), runner.clone()).unwrap();
            (batch, runner)
        }
    }

    #[tokio::test]
    async fn test_run_once_slices_every_config_and_moves_meshes() {
        let fixture = Fixture::new();
        fixture.add_mesh("model_1.stl");
        fixture.add_mesh("model_2.stl");
        fixture.add_mesh("notes.txt");
        let (batch, runner) = fixture.batch();

        let summary = batch.run_once().await.unwrap();

        assert_eq!(summary.meshes, 2);
        assert_eq!(summary.generated, 4);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.completed_models, vec!["model_1", "model_2"]);

        let sliced = &fixture.config.output_dir;
        assert!(sliced.join("cura/printer1/model_1.gcode").exists());
        assert!(sliced.join("cura/printer2/model_2.gcode").exists());

        assert!(!fixture.config.input_dir.join("model_1.stl").exists());
        assert!(fixture.config.completed_dir.join("model_2.stl").exists());
        assert!(fixture.config.input_dir.join("notes.txt").exists());

        let jobs = runner.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[0].args[0], std::ffi::OsString::from("--load"));
    }

    #[tokio::test]
    async fn test_existing_output_is_skipped() {
        let fixture = Fixture::new();
        fixture.add_mesh("model_1.stl");
        let existing = fixture.config.output_dir.join("cura/printer1/model_1.gcode");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"old").unwrap();
        let (batch, runner) = fixture.batch();

        let summary = batch.run_once().await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.generated, 1);
        assert_eq!(runner.jobs.lock().unwrap().len(), 1);
        assert_eq!(fs::read(existing).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_slicer_failure_is_counted_and_mesh_still_moved() {
        let fixture = Fixture::new();
        fixture.add_mesh("broken.stl");
        let (batch, _runner) = fixture.batch();

        let summary = batch.run_once().await.unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.generated, 0);
        assert_eq!(summary.completed_models, vec!["broken"]);
    }

    #[tokio::test]
    async fn test_missing_config_and_executable_are_skipped() {
        let mut fixture = Fixture::new();
        fixture.config.profiles[0]
            .configs
            .push(fixture.temp_dir.path().join("configs/missing.ini"));
        fixture.config.profiles.push(SlicerProfile {
            name: "ghost".into(),
            executable: PathBuf::from("nonexistent-slicer-binary-xyz"),
            config_flag: "--load".into(),
            leading_args: vec![],
            configs: fixture.config.profiles[0].configs.clone(),
        });
        fixture.add_mesh("model_1.stl");
        let (batch, runner) = fixture.batch();

        let summary = batch.run_once().await.unwrap();

        assert_eq!(summary.generated, 2);
        assert!(
            runner
                .jobs
                .lock()
                .unwrap()
                .iter()
                .all(|job| job.profile == "cura")
        );
        assert!(!fixture.config.output_dir.join("ghost").exists());
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let fixture = Fixture::new();
        let (batch, runner) = fixture.batch();

        let summary = batch.run_once().await.unwrap();
        assert_eq!(summary, SliceSummary::default());
        assert!(runner.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_until_empty_drains_input() {
        let fixture = Fixture::new();
        fixture.add_mesh("model_1.stl");
        fixture.add_mesh("model_2.stl");
        let (batch, _runner) = fixture.batch();

        let total = batch.run_until_empty().await.unwrap();

        assert_eq!(total.meshes, 2);
        assert_eq!(total.generated, 4);
        assert_eq!(total.completed_models.len(), 2);
        assert!(
            list_files_with_extension(&fixture.config.input_dir, "stl")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_run_until_empty_stops_when_nothing_can_be_moved() {
        let mut fixture = Fixture::new();
        fixture.config.on_collision = FileCollisionAction::Skip;
        fs::create_dir_all(&fixture.config.completed_dir).unwrap();
        fs::write(fixture.config.completed_dir.join("model_1.stl"), b"old").unwrap();
        fixture.add_mesh("model_1.stl");
        let (batch, _runner) = fixture.batch();

        let total = batch.run_until_empty().await.unwrap();

        assert_eq!(total.meshes, 1);
        assert!(total.completed_models.is_empty());
        assert!(fixture.config.input_dir.join("model_1.stl").exists());
    }

    #[test]
    fn test_batch_requires_a_profile() {
        let config = SlicingConfig::default();
        assert!(matches!(
            SliceBatch::new(config),
            Err(Error::Config { .. })
        ));
    }
}
