use crate::state::DomainLedger;
use std::sync::Arc;

/// Per-domain page quota against `max-pages-per-domain`
///
/// Counts successfully processed pages only: failed fetches and dropped
/// duplicates never consume quota. The counter is monotonic for the run.
/// Enforcement happens at admission time, so tasks already in flight when
/// the ceiling is reached still complete.
#[derive(Debug)]
pub struct QuotaTracker {
    ledger: Arc<DomainLedger>,
    max_pages: u32,
}

impl QuotaTracker {
    pub fn new(ledger: Arc<DomainLedger>, max_pages: u32) -> Self {
        Self { ledger, max_pages }
    }

    /// Whether the domain can still admit page tasks.
    pub fn is_under_limit(&self, domain: &str) -> bool {
        self.ledger
            .with(domain, |state| state.under_quota(self.max_pages))
    }

    /// Charges one successfully processed page to the domain.
    pub fn increment(&self, domain: &str) {
        self.ledger.with(domain, |state| state.record_page());
    }

    /// Pages charged to the domain so far.
    pub fn count(&self, domain: &str) -> u32 {
        self.ledger.pages_processed(domain)
    }
}
