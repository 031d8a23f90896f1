//! Errors raised while draining a prefix into a Maildir
//!
//! Every variant is fatal to the run. The first one raised cancels the
//! remaining workers and is returned from the pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Key '{key}' is not under prefix '{prefix}/'")]
    InvalidKey { key: String, prefix: String },

    #[error("Failed to fetch '{key}': {source}")]
    Fetch {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Local I/O failed for '{key}' at {location}: {source}", location = .path.display())]
    LocalIo {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Size mismatch for '{key}': listed {expected} bytes, wrote {actual}")]
    SizeMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to delete '{key}': {source}")]
    Delete {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Failed to list prefix '{prefix}': {source}")]
    Listing {
        prefix: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Transfer worker panicked or was aborted: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

impl DeliveryError {
    /// Object key the failure is attached to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::InvalidKey { key, .. }
            | Self::Fetch { key, .. }
            | Self::LocalIo { key, .. }
            | Self::SizeMismatch { key, .. }
            | Self::Delete { key, .. } => Some(key),
            Self::Listing { .. } | Self::Cancelled | Self::Worker(_) => None,
        }
    }

    /// Short operation name used as a log field
    pub fn operation(&self) -> &'static str {
        match self {
            Self::InvalidKey { .. } => "name",
            Self::Fetch { .. } => "fetch",
            Self::LocalIo { .. } | Self::SizeMismatch { .. } => "write",
            Self::Delete { .. } => "delete",
            Self::Listing { .. } => "list",
            Self::Cancelled => "cancel",
            Self::Worker(_) => "join",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
