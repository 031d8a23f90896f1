//! Moves one object from the bucket into the Maildir

use super::maildir::Maildir;
use super::naming::{HostIdentity, maildir_filename};
use crate::error::{DeliveryError, Result};
use crate::observability::DrainStats;
use crate::storage::{Bucket, ContentStream, ObjectDescriptor};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One object paired with the filename it is delivered under
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub object: ObjectDescriptor,
    pub filename: String,
}

impl TransferTask {
    pub fn resolve(object: ObjectDescriptor, prefix: &str, host: &HostIdentity) -> Result<Self> {
        let filename = maildir_filename(object.key(), prefix, object.last_modified, host)?;
        Ok(Self { object, filename })
    }

    pub fn key(&self) -> &str {
        self.object.key()
    }
}

/// Fetch, deliver and optionally delete
pub struct Transfer {
    bucket: Bucket,
    maildir: Maildir,
    delete: bool,
    verify_size: bool,
    stats: Arc<DrainStats>,
}

impl Transfer {
    pub fn new(
        bucket: Bucket,
        maildir: Maildir,
        delete: bool,
        verify_size: bool,
        stats: Arc<DrainStats>,
    ) -> Self {
        Self {
            bucket,
            maildir,
            delete,
            verify_size,
            stats,
        }
    }

    /// Deliver one object, returning the path it was published at
    ///
    /// The remote object is only deleted once the message has been synced
    /// and renamed into `new/`. Cancellation is honoured until the rename;
    /// after that the transfer runs to completion.
    pub async fn run(&self, task: &TransferTask, cancel: &CancellationToken) -> Result<PathBuf> {
        let key = task.key();

        if cancel.is_cancelled() {
            return Err(DeliveryError::Cancelled);
        }

        let mut content = self
            .bucket
            .open(&task.object.location)
            .await
            .map_err(|source| DeliveryError::Fetch {
                key: key.to_string(),
                source,
            })?;

        let staging = self.maildir.staging_path(&task.filename);
        let written = match stage(key, &staging, &mut content, cancel).await {
            Ok(written) => written,
            Err(err) => {
                discard(&staging).await;
                return Err(err);
            }
        };

        if self.verify_size && written != task.object.size {
            discard(&staging).await;
            return Err(DeliveryError::SizeMismatch {
                key: key.to_string(),
                expected: task.object.size,
                actual: written,
            });
        }

        let destination = self.maildir.delivery_path(&task.filename);
        if let Err(source) = fs::rename(&staging, &destination).await {
            discard(&staging).await;
            return Err(DeliveryError::LocalIo {
                key: key.to_string(),
                path: destination,
                source,
            });
        }

        self.stats.delivered(written);
        info!(key, path = %destination.display(), bytes = written, "Delivered message");

        if self.delete {
            self.bucket
                .delete(&task.object.location)
                .await
                .map_err(|source| DeliveryError::Delete {
                    key: key.to_string(),
                    source,
                })?;
            self.stats.deleted();
        }

        Ok(destination)
    }
}

/// Copy the content stream into a freshly created staging file and sync it
async fn stage(
    key: &str,
    path: &Path,
    content: &mut ContentStream,
    cancel: &CancellationToken,
) -> Result<u64> {
    let io_error = |source: std::io::Error| DeliveryError::LocalIo {
        key: key.to_string(),
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).await.map_err(io_error)?;
    let mut written = 0u64;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
            chunk = content.next() => chunk,
        };
        let Some(chunk) = chunk else { break };

        // a failed read mid-copy is reported as a local I/O failure
        let bytes = chunk.map_err(|e| io_error(e.into()))?;
        file.write_all(&bytes).await.map_err(io_error)?;
        written += bytes.len() as u64;
    }

    file.flush().await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)?;

    debug!(key, path = %path.display(), bytes = written, "Staged message");

    Ok(written)
}

async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed staging file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staging file"),
    }
}
