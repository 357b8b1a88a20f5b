//! Crawl frontier: which URLs enter the run, and when they stop mattering
//!
//! The frontier owns the run-scoped admission state: the visited index, the
//! per-domain page quotas, the retry ledger, and the content-digest set. The
//! engine consults it on every discovered link and reports every fetch
//! outcome back into it.

mod admission;
mod dedup;
mod quota;
mod retry;
mod task;
mod visited;

pub use admission::{extension_of, AdmissionFilter, RejectReason};
pub use dedup::ContentIndex;
pub use quota::QuotaTracker;
pub use retry::{RetryCoordinator, RetryDecision, RetryRecord};
pub use task::{CrawlTask, TaskKind};
pub use visited::{VisitState, VisitedIndex};

use crate::config::Config;
use crate::state::DomainLedger;
use crate::ConfigError;
use std::sync::Arc;

/// The injected bundle of run-scoped frontier state
///
/// Constructed once per run and shared by every worker. Each member guards
/// itself; there is no outer lock.
#[derive(Debug)]
pub struct Frontier {
    pub visited: Arc<VisitedIndex>,
    pub quota: Arc<QuotaTracker>,
    pub retries: Arc<RetryCoordinator>,
    pub content: Arc<ContentIndex>,
    admission: AdmissionFilter,
}

impl Frontier {
    /// Builds the frontier for one run.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    /// * `ledger` - Shared per-domain state ledger
    ///
    /// # Returns
    ///
    /// * `Ok(Frontier)` - Ready for admissions
    /// * `Err(ConfigError)` - An exclude pattern failed to compile
    pub fn new(config: &Config, ledger: Arc<DomainLedger>) -> Result<Self, ConfigError> {
        let visited = Arc::new(VisitedIndex::new());
        let quota = Arc::new(QuotaTracker::new(ledger, config.crawl.max_pages_per_domain));
        let retries = Arc::new(RetryCoordinator::new(
            config.retry.max_retries,
            config.retry.retry_delay(),
        ));
        let content = Arc::new(ContentIndex::new());
        let admission =
            AdmissionFilter::new(&config.crawl, Arc::clone(&visited), Arc::clone(&quota))?;

        Ok(Self {
            visited,
            quota,
            retries,
            content,
            admission,
        })
    }

    /// Screens a task; see [`AdmissionFilter::admit`].
    pub fn admit(&self, task: &CrawlTask) -> Result<(), RejectReason> {
        self.admission.admit(task)
    }
}
