//! G-code command usage report
//!
//! Walks a `<slicer>/<printer>/*.gcode` tree, counts how often each G and M command
//! appears in every file, and writes one CSV row per file.

mod csv;
mod tally;

pub use csv::write_csv;
pub use tally::{CommandCounts, FileTally, scan_tree, tally_commands};

use crate::config::ReportConfig;
use crate::error::{Error, Result};

/// Scan `config.gcode_root` and write the CSV to `config.output`
///
/// Returns the number of files tallied.
pub async fn generate_report(config: &ReportConfig) -> Result<usize> {
    config.validate()?;

    let root = config.gcode_root.clone();
    let extension = config.extension.clone();
    let output = config.output.clone();

    // File reads and the CSV write are plain blocking IO
    tokio::task::spawn_blocking(move || {
        let tallies = scan_tree(&root, &extension)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }
        let file = std::fs::File::create(&output).map_err(|e| Error::io_at(&output, e))?;
        let mut writer = std::io::BufWriter::new(file);
        write_csv(&tallies, &mut writer).map_err(|e| Error::io_at(&output, e))?;
        std::io::Write::flush(&mut writer).map_err(|e| Error::io_at(&output, e))?;

        tracing::info!(
            files = tallies.len(),
            output = %output.display(),
            "G-code command report written"
        );
        Ok(tallies.len())
    })
    .await
    .map_err(|e| Error::Other(format!("report task failed: {}", e)))?
}
