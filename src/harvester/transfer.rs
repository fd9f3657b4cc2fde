//! Single file transfer under the retry policy

use super::Harvester;
use crate::error::{Error, FetchError, Result, TransferError};
use crate::retry::{RetryOutcome, with_retry};
use crate::types::TransferOutcome;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::Instrument;

impl Harvester {
    /// Download `url` to `dest`, retrying remote failures per the retry policy
    ///
    /// The body is streamed into `<dest>.part` and renamed onto `dest` only once it is
    /// complete, so a failed transfer never leaves a file behind that a later run would
    /// mistake for a finished artifact.
    ///
    /// Exhausting every attempt is not an error: it is reported as
    /// [`TransferOutcome::Exhausted`] and the caller moves on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoAt`] when the destination cannot be created, written or
    /// renamed. Local failures are not retried.
    pub async fn fetch_to_path(&self, url: &str, dest: &Path) -> Result<TransferOutcome> {
        let span = tracing::info_span!("transfer", url = %url, dest = %dest.display());

        let outcome = with_retry(&self.config.retry, |_attempt| self.download_once(url, dest))
            .instrument(span)
            .await;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => Ok(TransferOutcome::Written {
                path: dest.to_path_buf(),
                bytes: value,
                attempts,
            }),
            RetryOutcome::Failed {
                error: TransferError::Remote(e),
                attempts,
            } => Ok(TransferOutcome::Exhausted {
                attempts,
                error: e.to_string(),
            }),
            RetryOutcome::Failed { error, .. } => Err(Error::from(error)),
        }
    }

    /// One attempt: request, stream to the part file, rename into place
    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
    ) -> std::result::Result<u64, TransferError> {
        let mut response = self.client.get(url).await?;

        let part = part_path(dest);
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(|source| TransferError::Local {
                path: part.clone(),
                source,
            })?;

        let mut written: u64 = 0;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(source) => {
                    drop(file);
                    discard_part(&part).await;
                    return Err(TransferError::Remote(FetchError::Network {
                        url: url.to_string(),
                        source,
                    }));
                }
            };

            if let Err(source) = file.write_all(&chunk).await {
                drop(file);
                discard_part(&part).await;
                return Err(TransferError::Local { path: part, source });
            }
            written += chunk.len() as u64;
        }

        if let Err(source) = file.flush().await {
            drop(file);
            discard_part(&part).await;
            return Err(TransferError::Local { path: part, source });
        }
        drop(file);

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|source| TransferError::Local {
                path: dest.to_path_buf(),
                source,
            })?;

        Ok(written)
    }
}

/// `<dest>.part`, next to the destination so the final rename stays on one filesystem
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

async fn discard_part(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %part.display(), error = %e, "Failed to remove partial file");
        }
    }
}
