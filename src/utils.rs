//! Utility functions for file operations and path manipulation

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Resolve the destination of a file move according to the collision action
///
/// # Returns
///
/// - `Overwrite`: the original path, whether or not it exists
/// - `Skip`: `None` if the path exists, the original path otherwise
/// - `Rename`: the original path if free, else the first free `stem (N).ext`
///
/// # Examples
///
/// ```
/// use model_harvest::utils::resolve_collision;
/// use model_harvest::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/model_42.stl");
/// let target = resolve_collision(path, FileCollisionAction::Rename).unwrap();
/// // If /tmp/model_42.stl exists, returns /tmp/model_42 (1).stl
/// // If that exists too, returns /tmp/model_42 (2).stl, etc.
/// # let _ = target;
/// ```
pub fn resolve_collision(path: &Path, action: FileCollisionAction) -> Result<Option<PathBuf>> {
    match action {
        FileCollisionAction::Overwrite => Ok(Some(path.to_path_buf())),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Ok(None);
            }
            Ok(Some(path.to_path_buf()))
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(Some(path.to_path_buf()));
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| invalid_path(path, "cannot extract file stem"))?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path
                .parent()
                .ok_or_else(|| invalid_path(path, "cannot extract parent directory"))?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(Some(new_path));
                }
            }

            Err(Error::io_at(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!(
                        "could not find a unique file name after {} attempts",
                        MAX_RENAME_ATTEMPTS
                    ),
                ),
            ))
        }
    }
}

fn invalid_path(path: &Path, reason: &str) -> Error {
    Error::io_at(
        path,
        std::io::Error::new(std::io::ErrorKind::InvalidInput, reason.to_string()),
    )
}

/// Move `source` into `dest_dir`, keeping its file name
///
/// The directory is created if needed. A rename is tried first; when it fails (for
/// example across filesystems) the file is copied and the source removed.
///
/// Returns the final path, or `None` when the collision action is `Skip` and the
/// destination already exists. In that case the source is left where it is.
pub async fn move_into_dir(
    source: &Path,
    dest_dir: &Path,
    action: FileCollisionAction,
) -> Result<Option<PathBuf>> {
    let file_name = source
        .file_name()
        .ok_or_else(|| invalid_path(source, "source has no file name"))?;

    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| Error::io_at(dest_dir, e))?;

    let Some(destination) = resolve_collision(&dest_dir.join(file_name), action)? else {
        tracing::warn!(
            source = %source.display(),
            dest_dir = %dest_dir.display(),
            "Destination already exists, leaving file in place"
        );
        return Ok(None);
    };

    if let Err(rename_err) = tokio::fs::rename(source, &destination).await {
        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            error = %rename_err,
            "Rename failed, falling back to copy"
        );
        tokio::fs::copy(source, &destination)
            .await
            .map_err(|e| Error::io_at(&destination, e))?;
        tokio::fs::remove_file(source)
            .await
            .map_err(|e| Error::io_at(source, e))?;
    }

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        "Moved file"
    );
    Ok(Some(destination))
}

/// Files directly inside `dir` whose extension is exactly `extension`, sorted by path
///
/// Subdirectories are not descended into.
pub async fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io_at(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_at(dir, e))?
    {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map_err(|e| Error::io_at(&path, e))?
            .is_file();
        if is_file && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
