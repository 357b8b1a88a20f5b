//! Filesystem-backed artifact storage
//!
//! Artifacts are written beneath a single root directory using the
//! relative paths produced by [`crate::storage::artifact_rel_path`].

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::storage::traits::{ArtifactStore, StorageError, StorageResult};

/// Artifact store that writes documents under a root directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`. The directory is created lazily
    /// on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the absolute path an artifact would be written to.
    pub fn full_path(&self, rel_path: &Path) -> PathBuf {
        self.root.join(rel_path)
    }

    fn check_relative(rel_path: &Path) -> StorageResult<()> {
        let escapes = rel_path.components().any(|c| {
            matches!(
                c,
                Component::RootDir | Component::Prefix(_) | Component::ParentDir
            )
        });
        if escapes || rel_path.as_os_str().is_empty() {
            return Err(StorageError::InvalidPath(
                rel_path.to_string_lossy().into_owned(),
            ));
        }
        Ok(())
    }
}

impl ArtifactStore for FsArtifactStore {
    async fn write(&self, rel_path: &Path, bytes: &[u8]) -> StorageResult<()> {
        Self::check_relative(rel_path)?;

        let full = self.root.join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, bytes).await?;

        debug!("Stored {} bytes at {}", bytes.len(), full.display());
        Ok(())
    }
}
