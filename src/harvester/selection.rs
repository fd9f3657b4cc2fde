//! Descriptor selection
//!
//! Turns a file manifest into the ordered list of transfers for one candidate. This is
//! a pure function of the manifest and the storage settings, so the rules can be
//! checked without a network:
//! - a descriptor qualifies only if its size is a known integer strictly below the
//!   ceiling and it has a download URL. Negative sizes count as unknown and are
//!   rejected, as are null or non-string names and URLs
//! - the first qualifying mesh is claimed; later meshes are ignored even if the
//!   claimed transfer later fails
//! - every qualifying G-code is planned, named per [`GcodeNaming`](crate::config::GcodeNaming)
//! - everything else is dropped without comment

use crate::config::StorageConfig;
use crate::types::{ArtifactKind, RemoteFile, ThingId};
use std::path::PathBuf;

/// A transfer chosen from the manifest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedTransfer {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Remote file name
    pub name: String,
    /// Source URL
    pub url: String,
    /// Deterministic local destination
    pub destination: PathBuf,
}

/// Plan the transfers for one candidate, in manifest order
pub fn plan_transfers(
    id: ThingId,
    files: &[RemoteFile],
    storage: &StorageConfig,
) -> Vec<PlannedTransfer> {
    let mesh_suffix = format!(".{}", storage.mesh_extension);
    let gcode_suffix = format!(".{}", storage.gcode_extension);

    let mut mesh_claimed = false;
    let mut gcode_count = 0;
    let mut plan = Vec::new();

    for file in files {
        if !is_transferable(file, storage.max_file_size) {
            continue;
        }

        if file.name.ends_with(&mesh_suffix) {
            if mesh_claimed {
                continue;
            }
            mesh_claimed = true;
            plan.push(PlannedTransfer {
                kind: ArtifactKind::Mesh,
                name: file.name.clone(),
                url: file.download_url.clone(),
                destination: storage.mesh_path(id.get()),
            });
        } else if file.name.ends_with(&gcode_suffix) {
            plan.push(PlannedTransfer {
                kind: ArtifactKind::Gcode,
                name: file.name.clone(),
                url: file.download_url.clone(),
                destination: storage.gcode_path(id.get(), gcode_count),
            });
            gcode_count += 1;
        }
    }

    plan
}

/// Size known, below the ceiling, and something to download
fn is_transferable(file: &RemoteFile, max_file_size: u64) -> bool {
    matches!(file.size, Some(size) if size < max_file_size) && !file.download_url.is_empty()
}
