//! Storage module for persisting crawl output
//!
//! This module handles everything written to disk during a crawl:
//! - Artifact path derivation from canonical URLs
//! - Filesystem artifact writes under the output root
//! - Per-domain JSON manifests describing stored artifacts

mod fs;
mod manifest;
mod paths;
mod traits;

pub use fs::FsArtifactStore;
pub use manifest::{sha256_hex, ManifestEntry, ManifestStore};
pub use paths::{artifact_rel_path, content_type_essence, extension_for, is_html};
pub use traits::{ArtifactStore, StorageError, StorageResult};
