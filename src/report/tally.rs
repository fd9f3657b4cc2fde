//! Command counting and tree scan

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Occurrences per command word (e.g. "G1" -> 1200)
pub type CommandCounts = BTreeMap<String, u64>;

/// Command counts of one G-code file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileTally {
    /// First-level directory name
    pub slicer: String,
    /// Second-level directory name
    pub printer: String,
    /// File name
    pub file: String,
    /// G commands
    pub gcodes: CommandCounts,
    /// M commands
    pub mcodes: CommandCounts,
}

impl FileTally {
    /// Total G commands
    pub fn total_gcodes(&self) -> u64 {
        self.gcodes.values().sum()
    }

    /// Total M commands
    pub fn total_mcodes(&self) -> u64 {
        self.mcodes.values().sum()
    }

    /// Count for one command, zero when absent
    pub fn count(&self, command: &str) -> u64 {
        self.gcodes
            .get(command)
            .or_else(|| self.mcodes.get(command))
            .copied()
            .unwrap_or(0)
    }
}

/// Count the G and M commands of a G-code stream
///
/// Only lines that start with `G` or `M` count; the command is the first
/// whitespace-separated word, so `G1 X10` counts as `G1`. Comments and indented lines
/// are ignored. Bytes that are not valid UTF-8 are replaced, never rejected.
pub fn tally_commands<R: BufRead>(mut reader: R) -> std::io::Result<(CommandCounts, CommandCounts)> {
    let mut gcodes = CommandCounts::new();
    let mut mcodes = CommandCounts::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let counts = match line.as_bytes().first() {
            Some(&b'G') => &mut gcodes,
            Some(&b'M') => &mut mcodes,
            _ => continue,
        };
        if let Some(command) = line.split_whitespace().next() {
            *counts.entry(command.to_string()).or_insert(0) += 1;
        }
    }

    Ok((gcodes, mcodes))
}

/// Tally every `<base>/<slicer>/<printer>/*.<extension>` file
///
/// Exactly two directory levels are read. Directories and files are visited in name
/// order so the output is stable across runs.
pub fn scan_tree(base: &Path, extension: &str) -> Result<Vec<FileTally>> {
    let mut tallies = Vec::new();

    for slicer_dir in sorted_entries(base, EntryKind::Dir)? {
        for printer_dir in sorted_entries(&slicer_dir, EntryKind::Dir)? {
            for file in sorted_entries(&printer_dir, EntryKind::File)? {
                if file.extension().is_none_or(|ext| ext != extension) {
                    continue;
                }

                let handle = std::fs::File::open(&file).map_err(|e| Error::io_at(&file, e))?;
                let (gcodes, mcodes) = tally_commands(std::io::BufReader::new(handle))
                    .map_err(|e| Error::io_at(&file, e))?;

                tracing::debug!(path = %file.display(), "Tallied G-code file");
                tallies.push(FileTally {
                    slicer: name_of(&slicer_dir),
                    printer: name_of(&printer_dir),
                    file: name_of(&file),
                    gcodes,
                    mcodes,
                });
            }
        }
    }

    Ok(tallies)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
}

fn sorted_entries(dir: &Path, kind: EntryKind) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io_at(dir, e))? {
        let entry = entry.map_err(|e| Error::io_at(dir, e))?;
        let path = entry.path();
        let matches = match kind {
            EntryKind::Dir => path.is_dir(),
            EntryKind::File => path.is_file(),
        };
        if matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
