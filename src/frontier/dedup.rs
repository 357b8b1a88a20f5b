use std::collections::HashSet;
use std::sync::Mutex;
use xxhash_rust::xxh3::xxh3_64;

/// Run-scoped index of page-body digests
///
/// Bodies are keyed by xxh3-64, cheap enough to hash every response without
/// touching the artifact pipeline. The SHA-256 recorded in manifests is
/// computed separately at storage time; this set only answers "have we
/// stored these bytes before".
#[derive(Debug, Default)]
pub struct ContentIndex {
    digests: Mutex<HashSet<u64>>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a body; returns `false` if identical bytes were registered
    /// earlier in the run.
    pub fn insert(&self, body: &[u8]) -> bool {
        self.digests.lock().unwrap().insert(xxh3_64(body))
    }

    /// Whether identical bytes have been registered.
    pub fn contains(&self, body: &[u8]) -> bool {
        self.digests.lock().unwrap().contains(&xxh3_64(body))
    }

    /// Distinct bodies registered so far.
    pub fn len(&self) -> usize {
        self.digests.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
