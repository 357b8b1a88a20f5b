//! Run statistics accumulation
//!
//! Workers report outcomes into `RunStats` as they happen; a snapshot at
//! the end of the run becomes the `RunSummary` rendered into the report.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Counters for a single domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainCounters {
    /// Pages fetched, stored, and traversed
    pub pages_stored: u64,

    /// Assets fetched and stored
    pub assets_stored: u64,

    /// Page bodies dropped as duplicates of already-stored content
    pub duplicates: u64,

    /// Retry dispatches scheduled
    pub retries: u64,

    /// URLs that failed terminally
    pub failures: u64,

    /// Bodies dropped for exceeding the size cap
    pub oversize: u64,

    /// Tasks turned away by the admission filter
    pub rejected: u64,
}

/// One terminally failed URL and the reason it was given up on
#[derive(Debug, Clone)]
pub struct FailureEntry {
    pub url: String,
    pub reason: String,
}

/// Thread-safe accumulator for everything the run counts
#[derive(Debug, Default)]
pub struct RunStats {
    inner: Mutex<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    domains: BTreeMap<String, DomainCounters>,
    rejections: BTreeMap<&'static str, u64>,
    failures: Vec<FailureEntry>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully stored and traversed page.
    pub fn record_page(&self, domain: &str) {
        self.with_domain(domain, |counters| counters.pages_stored += 1);
    }

    /// Records a successfully stored asset.
    pub fn record_asset(&self, domain: &str) {
        self.with_domain(domain, |counters| counters.assets_stored += 1);
    }

    /// Records a page body dropped as duplicate content.
    pub fn record_duplicate(&self, domain: &str) {
        self.with_domain(domain, |counters| counters.duplicates += 1);
    }

    /// Records a scheduled retry dispatch.
    pub fn record_retry(&self, domain: &str) {
        self.with_domain(domain, |counters| counters.retries += 1);
    }

    /// Records a body dropped for exceeding the size cap.
    pub fn record_oversize(&self, domain: &str) {
        self.with_domain(domain, |counters| counters.oversize += 1);
    }

    /// Records a terminal failure with its reason.
    pub fn record_failure(&self, domain: &str, url: &str, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.domains.entry(domain.to_string()).or_default().failures += 1;
        inner.failures.push(FailureEntry {
            url: url.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Records an admission rejection against the task's domain, under the
    /// failing check's label.
    pub fn record_rejection(&self, domain: &str, label: &'static str) {
        let mut inner = self.inner.lock().unwrap();
        inner.domains.entry(domain.to_string()).or_default().rejected += 1;
        *inner.rejections.entry(label).or_insert(0) += 1;
    }

    /// Freezes the counters into an end-of-run summary.
    pub fn snapshot(&self, duration: Duration, interrupted: bool) -> RunSummary {
        let inner = self.inner.lock().unwrap();

        let mut pages_stored = 0;
        let mut assets_stored = 0;
        let mut duplicates = 0;
        let mut retries = 0;
        let mut oversize = 0;
        for counters in inner.domains.values() {
            pages_stored += counters.pages_stored;
            assets_stored += counters.assets_stored;
            duplicates += counters.duplicates;
            retries += counters.retries;
            oversize += counters.oversize;
        }

        RunSummary {
            pages_stored,
            assets_stored,
            duplicates,
            retries,
            oversize,
            failures: inner.failures.clone(),
            rejections: inner.rejections.clone(),
            domains: inner.domains.clone(),
            duration,
            interrupted,
        }
    }

    fn with_domain(&self, domain: &str, f: impl FnOnce(&mut DomainCounters)) {
        let mut inner = self.inner.lock().unwrap();
        f(inner.domains.entry(domain.to_string()).or_default());
    }
}

/// Immutable end-of-run totals
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Pages stored across all domains
    pub pages_stored: u64,

    /// Assets stored across all domains
    pub assets_stored: u64,

    /// Duplicate page bodies dropped
    pub duplicates: u64,

    /// Retry dispatches scheduled
    pub retries: u64,

    /// Bodies dropped for exceeding the size cap
    pub oversize: u64,

    /// Every terminally failed URL with its reason
    pub failures: Vec<FailureEntry>,

    /// Admission rejections by failing check
    pub rejections: BTreeMap<&'static str, u64>,

    /// Per-domain breakdown, sorted by domain
    pub domains: BTreeMap<String, DomainCounters>,

    /// Wall-clock run duration
    pub duration: Duration,

    /// Whether the run was cut short by a shutdown signal
    pub interrupted: bool,
}

impl RunSummary {
    /// Total admission rejections across all checks.
    pub fn total_rejections(&self) -> u64 {
        self.rejections.values().sum()
    }
}
