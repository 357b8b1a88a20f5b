use std::collections::HashMap;
use std::sync::Mutex;

/// Lifecycle of a URL inside the visited index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    /// Admitted and dispatched, outcome not yet known
    InFlight,
    /// Finally resolved: stored, duplicate-dropped, abandoned, or otherwise
    /// done for this run
    Completed,
}

/// The visited index: every canonical URL the run has ever admitted
///
/// URLs are marked in-flight at admission and finalized when their outcome
/// is known. Both states block re-admission, so a URL is dispatched at most
/// once per run (retries re-enter dispatch without touching the index).
#[derive(Debug, Default)]
pub struct VisitedIndex {
    urls: Mutex<HashMap<String, VisitState>>,
}

impl VisitedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a URL in-flight iff it has never been seen.
    ///
    /// Insert-if-absent under one lock: of N concurrent callers for the same
    /// URL, exactly one gets `true`.
    pub fn begin(&self, url: &str) -> bool {
        let mut urls = self.urls.lock().unwrap();
        if urls.contains_key(url) {
            return false;
        }
        urls.insert(url.to_string(), VisitState::InFlight);
        true
    }

    /// Whether the URL is present in either state.
    pub fn contains(&self, url: &str) -> bool {
        self.urls.lock().unwrap().contains_key(url)
    }

    /// Marks a URL finally resolved.
    pub fn finalize(&self, url: &str) {
        self.urls
            .lock()
            .unwrap()
            .insert(url.to_string(), VisitState::Completed);
    }

    /// Current state of a URL, if any.
    pub fn state_of(&self, url: &str) -> Option<VisitState> {
        self.urls.lock().unwrap().get(url).copied()
    }

    /// Number of URLs tracked.
    pub fn len(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
