//! Per-domain crawl manifests
//!
//! Each domain accumulates a JSON manifest mapping canonical URLs to the
//! artifacts stored for them. Manifest files live under
//! `<output root>/manifests/` so they can never collide with artifact
//! paths, and each file is rewritten in full whenever one of its entries
//! changes.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::storage::paths::sanitize_segment;
use crate::storage::traits::StorageResult;

/// One stored artifact, keyed in the manifest by its canonical URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Artifact path relative to the output root
    pub file_path: String,
    /// SHA-256 of the stored bytes, hex encoded
    pub hash: String,
    /// Response Content-Type essence
    pub content_type: String,
    /// Page title, empty when the document had none
    pub title: String,
    /// Link depth at which the URL was fetched
    pub depth: u32,
    /// Fetch completion time, RFC 3339
    pub timestamp: String,
    /// Stored size in bytes
    pub size: u64,
}

type DomainManifest = Arc<tokio::sync::Mutex<BTreeMap<String, ManifestEntry>>>;

/// Accumulates manifest entries and mirrors them to disk.
///
/// Entries for one domain are serialized behind that domain's lock, so
/// concurrent completions rewrite the file one at a time and the file on
/// disk always reflects a consistent snapshot.
#[derive(Debug)]
pub struct ManifestStore {
    dir: PathBuf,
    domains: Mutex<HashMap<String, DomainManifest>>,
}

impl ManifestStore {
    /// Creates a store writing manifests under `<output_root>/manifests/`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            dir: output_root.into().join("manifests"),
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the path of a domain's manifest file.
    ///
    /// The `www.` prefix is stripped like in artifact paths, so both host
    /// variants of a site share one manifest.
    pub fn manifest_path(&self, domain: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_segment(site_key(domain))))
    }

    /// Adds or replaces the entry for `url` and rewrites the domain's
    /// manifest file.
    pub async fn record(
        &self,
        domain: &str,
        url: &str,
        entry: ManifestEntry,
    ) -> StorageResult<()> {
        let domain = site_key(domain);
        let manifest = self.domain_manifest(domain);
        let mut entries = manifest.lock().await;
        entries.insert(url.to_string(), entry);
        self.write_file(domain, &entries).await
    }

    /// Rewrites every domain's manifest file from the in-memory state.
    pub async fn flush_all(&self) -> StorageResult<()> {
        let manifests: Vec<(String, DomainManifest)> = {
            let domains = self.domains.lock().unwrap();
            domains
                .iter()
                .map(|(domain, manifest)| (domain.clone(), Arc::clone(manifest)))
                .collect()
        };

        for (domain, manifest) in manifests {
            let entries = manifest.lock().await;
            self.write_file(&domain, &entries).await?;
        }
        Ok(())
    }

    fn domain_manifest(&self, domain: &str) -> DomainManifest {
        let mut domains = self.domains.lock().unwrap();
        Arc::clone(domains.entry(domain.to_string()).or_default())
    }

    async fn write_file(
        &self,
        domain: &str,
        entries: &BTreeMap<String, ManifestEntry>,
    ) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(entries)?;
        let path = self.manifest_path(domain);
        fs::write(&path, json).await?;

        debug!("Wrote manifest for {} ({} entries)", domain, entries.len());
        Ok(())
    }
}

/// Manifest key for a host: the `www.` prefix is stripped, matching the
/// artifact path derivation.
fn site_key(domain: &str) -> &str {
    domain.strip_prefix("www.").unwrap_or(domain)
}

/// Hex-encoded SHA-256 digest of a document body.
///
/// # Examples
///
/// ```
/// use tidepool::storage::sha256_hex;
///
/// let digest = sha256_hex(b"hello");
/// assert_eq!(
///     digest,
///     "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
/// );
/// ```
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file_path: &str, body: &[u8]) -> ManifestEntry {
        ManifestEntry {
            file_path: file_path.to_string(),
            hash: sha256_hex(body),
            content_type: "text/html".to_string(),
            title: "Test Page".to_string(),
            depth: 1,
            timestamp: "2024-01-15T10:30:00+00:00".to_string(),
            size: body.len() as u64,
        }
    }

    async fn read_manifest(path: &Path) -> BTreeMap<String, ManifestEntry> {
        let json = fs::read_to_string(path).await.unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[tokio::test]
    async fn test_record_writes_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let entry = entry("example.com/index.html", b"<html></html>");

        store
            .record("example.com", "https://example.com/", entry.clone())
            .await
            .unwrap();

        let entries = read_manifest(&store.manifest_path("example.com")).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["https://example.com/"], entry);
    }

    #[tokio::test]
    async fn test_entries_accumulate_per_domain() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());

        store
            .record(
                "example.com",
                "https://example.com/b",
                entry("example.com/b.html", b"b"),
            )
            .await
            .unwrap();
        store
            .record(
                "example.com",
                "https://example.com/a",
                entry("example.com/a.html", b"a"),
            )
            .await
            .unwrap();

        let entries = read_manifest(&store.manifest_path("example.com")).await;
        assert_eq!(entries.len(), 2);
        let keys: Vec<&String> = entries.keys().collect();
        assert_eq!(keys, ["https://example.com/a", "https://example.com/b"]);
    }

    #[tokio::test]
    async fn test_domains_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());

        store
            .record(
                "example.com",
                "https://example.com/",
                entry("example.com/index.html", b"x"),
            )
            .await
            .unwrap();
        store
            .record(
                "other.org",
                "https://other.org/",
                entry("other.org/index.html", b"y"),
            )
            .await
            .unwrap();

        assert!(store.manifest_path("example.com").exists());
        assert!(store.manifest_path("other.org").exists());
        assert_eq!(
            read_manifest(&store.manifest_path("example.com")).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_record_same_url_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let url = "https://example.com/page";

        store
            .record("example.com", url, entry("example.com/page.html", b"old"))
            .await
            .unwrap();
        store
            .record("example.com", url, entry("example.com/page.html", b"new"))
            .await
            .unwrap();

        let entries = read_manifest(&store.manifest_path("example.com")).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[url].hash, sha256_hex(b"new"));
    }

    #[tokio::test]
    async fn test_flush_all_rewrites_every_domain() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());

        store
            .record(
                "example.com",
                "https://example.com/",
                entry("example.com/index.html", b"x"),
            )
            .await
            .unwrap();
        store
            .record(
                "other.org",
                "https://other.org/",
                entry("other.org/index.html", b"y"),
            )
            .await
            .unwrap();

        fs::remove_file(store.manifest_path("example.com"))
            .await
            .unwrap();
        fs::remove_file(store.manifest_path("other.org")).await.unwrap();

        store.flush_all().await.unwrap();
        assert!(store.manifest_path("example.com").exists());
        assert!(store.manifest_path("other.org").exists());
    }

    #[tokio::test]
    async fn test_www_and_bare_hosts_share_one_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());

        store
            .record(
                "www.example.com",
                "https://www.example.com/",
                entry("example.com/index.html", b"home"),
            )
            .await
            .unwrap();
        store
            .record(
                "example.com",
                "https://example.com/about",
                entry("example.com/about.html", b"about"),
            )
            .await
            .unwrap();

        assert_eq!(
            store.manifest_path("www.example.com"),
            store.manifest_path("example.com")
        );

        let entries = read_manifest(&store.manifest_path("example.com")).await;
        assert_eq!(entries.len(), 2);
        assert!(!dir.path().join("manifests/www.example.com.json").exists());
    }

    #[test]
    fn test_manifest_path_sanitizes_domain() {
        let store = ManifestStore::new("/tmp/out");
        assert_eq!(
            store.manifest_path("127.0.0.1"),
            PathBuf::from("/tmp/out/manifests/127.0.0.1.json")
        );
        assert_eq!(
            store.manifest_path("bad/host"),
            PathBuf::from("/tmp/out/manifests/bad_host.json")
        );
    }

    #[test]
    fn test_sha256_hex_known_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_manifest_entry_round_trip() {
        let entry = entry("example.com/page.html", b"body");
        let json = serde_json::to_string(&entry).unwrap();
        let back: ManifestEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
