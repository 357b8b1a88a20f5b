//! Storage traits and error types
//!
//! This module defines the trait interface for artifact persistence and
//! associated error types.

use std::future::Future;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid artifact path: {0}")]
    InvalidPath(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for artifact storage backends
///
/// Paths are relative to the store root; implementations create any
/// missing parent directories. Writing to an existing path replaces the
/// previous content.
pub trait ArtifactStore: Send + Sync {
    /// Persists `bytes` at `rel_path` under the store root
    ///
    /// # Arguments
    ///
    /// * `rel_path` - Destination relative to the store root
    /// * `bytes` - Document body to persist
    fn write(
        &self,
        rel_path: &Path,
        bytes: &[u8],
    ) -> impl Future<Output = StorageResult<()>> + Send;
}
