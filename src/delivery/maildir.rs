//! Local Maildir delivery target
//!
//! Deliveries are written under `tmp/` and moved into `new/` with a rename,
//! so a reader of `new/` only ever sees complete messages.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const NEW_DIR: &str = "new";
const TMP_DIR: &str = "tmp";
const CUR_DIR: &str = "cur";

#[derive(Debug, Clone)]
pub struct Maildir {
    root: PathBuf,
}

impl Maildir {
    /// Open an existing Maildir; `new/` and `tmp/` must be directories
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();

        for sub in [NEW_DIR, TMP_DIR] {
            let dir = root.join(sub);
            let meta = fs::metadata(&dir).await.map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {}", dir.display(), e))
            })?;
            if !meta.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is not a directory", dir.display()),
                ));
            }
        }

        tracing::debug!(root = %root.display(), "Opened maildir");

        Ok(Self { root })
    }

    /// Create `new/`, `cur/` and `tmp/` under `root` and open it
    pub async fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        for sub in [NEW_DIR, CUR_DIR, TMP_DIR] {
            fs::create_dir_all(root.join(sub)).await?;
        }
        Self::open(root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn new_dir(&self) -> PathBuf {
        self.root.join(NEW_DIR)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    /// Where a message is written while in flight
    pub fn staging_path(&self, filename: &str) -> PathBuf {
        self.tmp_dir().join(filename)
    }

    /// Where a finished message is published
    pub fn delivery_path(&self, filename: &str) -> PathBuf {
        self.new_dir().join(filename)
    }
}
