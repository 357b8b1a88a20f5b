use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Tracks the state of a single domain during crawling
///
/// One record per distinct host, created lazily on first contact. Pacing,
/// quota, and retry bookkeeping all read and write through this record, so
/// every update happens under the ledger lock.
#[derive(Debug)]
pub struct DomainState {
    /// Pages successfully processed for this domain (the quota counter)
    pub pages_processed: u32,

    /// Reserved time of the most recent dispatch to this domain
    pub last_dispatch: Option<Instant>,

    /// Cumulative requests dispatched to this domain, feeding the
    /// progressive delay multiplier
    pub request_count: u32,

    /// Retries currently scheduled but not yet re-dispatched
    pub retries_in_flight: u32,

    /// Concurrency slots for fetches against this domain
    fetch_slots: Arc<Semaphore>,
}

impl DomainState {
    /// Creates a new DomainState with the given per-domain concurrency.
    pub fn new(fetch_slot_count: usize) -> Self {
        Self {
            pages_processed: 0,
            last_dispatch: None,
            request_count: 0,
            retries_in_flight: 0,
            fetch_slots: Arc::new(Semaphore::new(fetch_slot_count)),
        }
    }

    /// Reserves the next dispatch slot for this domain.
    ///
    /// The slot is the later of `now` and `last_dispatch + delay`, so two
    /// reservations can never be closer together than the delay that
    /// separated them, no matter how the callers interleave. The request
    /// count is bumped as part of the reservation.
    ///
    /// # Arguments
    ///
    /// * `delay` - Minimum spacing since the previous dispatch
    /// * `now` - The current time instant
    ///
    /// # Returns
    ///
    /// The instant the caller may dispatch at (possibly already past).
    pub fn reserve_dispatch(&mut self, delay: Duration, now: Instant) -> Instant {
        let slot = match self.last_dispatch {
            Some(last) => std::cmp::max(now, last + delay),
            None => now,
        };
        self.last_dispatch = Some(slot);
        self.request_count += 1;
        slot
    }

    /// Records one successfully processed page.
    pub fn record_page(&mut self) {
        self.pages_processed += 1;
    }

    /// Checks the quota counter against the configured ceiling.
    pub fn under_quota(&self, max_pages: u32) -> bool {
        self.pages_processed < max_pages
    }

    /// Handle to this domain's fetch-slot semaphore.
    pub fn fetch_slots(&self) -> Arc<Semaphore> {
        Arc::clone(&self.fetch_slots)
    }
}

/// Ledger of per-domain state, keyed by lowercase host
///
/// A single lock guards the whole map; every entry operation is a short
/// read-modify-write, so per-key updates are atomic.
#[derive(Debug)]
pub struct DomainLedger {
    fetch_slot_count: usize,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl DomainLedger {
    /// Creates an empty ledger; entries get `fetch_slot_count` concurrency
    /// slots each.
    pub fn new(fetch_slot_count: usize) -> Self {
        Self {
            fetch_slot_count,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` against the domain's state under the ledger lock, creating
    /// the entry on first contact.
    pub fn with<T>(&self, domain: &str, f: impl FnOnce(&mut DomainState) -> T) -> T {
        let mut domains = self.domains.lock().unwrap();
        let state = domains
            .entry(domain.to_string())
            .or_insert_with(|| DomainState::new(self.fetch_slot_count));
        f(state)
    }

    /// Fetch-slot semaphore for a domain.
    pub fn fetch_slots(&self, domain: &str) -> Arc<Semaphore> {
        self.with(domain, |state| state.fetch_slots())
    }

    /// Pages successfully processed for a domain.
    pub fn pages_processed(&self, domain: &str) -> u32 {
        self.with(domain, |state| state.pages_processed)
    }

    /// Number of domains contacted so far.
    pub fn domain_count(&self) -> usize {
        self.domains.lock().unwrap().len()
    }
}
