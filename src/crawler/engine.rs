//! Crawl engine
//!
//! Owns the run loop: seeding, admission, permit acquisition, pacing,
//! fetching, and the completion pipeline. Discovered links re-enter the
//! loop through an unbounded task queue; an outstanding-work counter
//! detects the moment the queue and every in-flight fetch have drained.
//! A shutdown signal stops dispatch, lets in-flight fetches finish, and
//! still produces manifests and a summary.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::crawler::fetcher::{FailureKind, FetchOutcome, Fetcher};
use crate::crawler::parser::{parse_page, ParsedPage};
use crate::crawler::politeness::Pacer;
use crate::frontier::{extension_of, CrawlTask, Frontier, RetryDecision, TaskKind};
use crate::output::{RunStats, RunSummary};
use crate::state::DomainLedger;
use crate::storage::{
    artifact_rel_path, content_type_essence, is_html, sha256_hex, ArtifactStore, FsArtifactStore,
    ManifestEntry, ManifestStore,
};
use crate::url::{canonicalize, ScopeList};
use crate::Result;

/// Message type of the task queue
enum QueueEvent {
    /// A task awaiting dispatch
    Task(CrawlTask),
    /// The outstanding-work counter reached zero
    Drained,
}

/// Drives one complete crawl run.
///
/// Construct with a validated configuration and call [`CrawlEngine::run`]
/// once; the engine's frontier and statistics are scoped to that run.
pub struct CrawlEngine {
    shared: Arc<EngineShared>,
}

/// State shared between the run loop and every spawned worker.
struct EngineShared {
    config: Config,
    frontier: Frontier,
    ledger: Arc<DomainLedger>,
    scope: ScopeList,
    pacer: Pacer,
    fetcher: Fetcher,
    store: FsArtifactStore,
    manifests: ManifestStore,
    stats: RunStats,
    global_slots: Arc<Semaphore>,
    outstanding: AtomicUsize,
    shutdown: AtomicBool,
}

impl CrawlEngine {
    /// Builds the engine from a validated configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlEngine)` - Ready to run
    /// * `Err(TidepoolError)` - An exclude pattern failed to compile or
    ///   the HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        let ledger = Arc::new(DomainLedger::new(config.limits.per_domain_concurrency));
        let frontier = Frontier::new(&config, Arc::clone(&ledger))?;
        let scope = ScopeList::new(&config.crawl.allowed_domains);
        let pacer = Pacer::new(Arc::clone(&ledger), &config.politeness);
        let fetcher = Fetcher::new(&config)?;
        let store = FsArtifactStore::new(&config.output.root_dir);
        let manifests = ManifestStore::new(&config.output.root_dir);
        let global_slots = Arc::new(Semaphore::new(config.limits.global_concurrency));

        Ok(Self {
            shared: Arc::new(EngineShared {
                config,
                frontier,
                ledger,
                scope,
                pacer,
                fetcher,
                store,
                manifests,
                stats: RunStats::new(),
                global_slots,
                outstanding: AtomicUsize::new(0),
                shutdown: AtomicBool::new(false),
            }),
        })
    }

    /// Runs the crawl to completion and returns the run summary.
    ///
    /// The run ends when every seed, discovered link, and scheduled retry
    /// has resolved, or early when a Ctrl-C arrives; either way manifests
    /// are flushed before the summary is returned.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = std::time::Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel::<QueueEvent>();

        let seeded = self.seed(&tx);
        info!(
            "Crawl started: {} seed(s), {} allowed domain(s)",
            seeded,
            self.shared.config.crawl.allowed_domains.len()
        );

        let mut workers: JoinSet<()> = JoinSet::new();

        if seeded > 0 {
            let shutdown_signal = tokio::signal::ctrl_c();
            tokio::pin!(shutdown_signal);

            loop {
                tokio::select! {
                    _ = &mut shutdown_signal, if !self.shared.shutdown.load(Ordering::SeqCst) => {
                        info!("Shutdown requested; draining in-flight work");
                        self.shared.shutdown.store(true, Ordering::SeqCst);
                    }
                    Some(joined) = workers.join_next(), if !workers.is_empty() => {
                        if let Err(error) = joined {
                            warn!("Crawl worker panicked: {}", error);
                        }
                    }
                    event = rx.recv() => {
                        match event {
                            Some(QueueEvent::Task(task)) => self.dispatch(task, &tx, &mut workers),
                            Some(QueueEvent::Drained) | None => break,
                        }
                    }
                }
            }
        }

        while workers.join_next().await.is_some() {}

        self.shared.manifests.flush_all().await?;

        let interrupted = self.shared.shutdown.load(Ordering::SeqCst);
        let summary = self.shared.stats.snapshot(started.elapsed(), interrupted);
        info!(
            "Crawl finished in {:.1}s: {} pages, {} assets, {} failures, {} rejections",
            summary.duration.as_secs_f64(),
            summary.pages_stored,
            summary.assets_stored,
            summary.failures.len(),
            summary.total_rejections()
        );
        Ok(summary)
    }

    /// Enqueues the configured seed URLs; returns how many were accepted.
    fn seed(&self, tx: &UnboundedSender<QueueEvent>) -> usize {
        let mut seeded = 0;
        for raw in &self.shared.config.crawl.seeds {
            let url = match canonicalize(raw, None) {
                Ok(url) => url,
                Err(error) => {
                    warn!("Skipping seed {}: {}", raw, error);
                    continue;
                }
            };
            match CrawlTask::seed(url) {
                Ok(task) => {
                    self.shared.enqueue(tx, task);
                    seeded += 1;
                }
                Err(error) => warn!("Skipping seed {}: {}", raw, error),
            }
        }
        seeded
    }

    /// Screens one received task and spawns a worker for it if admitted.
    fn dispatch(
        &self,
        task: CrawlTask,
        tx: &UnboundedSender<QueueEvent>,
        workers: &mut JoinSet<()>,
    ) {
        let shared = &self.shared;

        if task.is_retry() {
            shared.ledger.with(&task.domain, |state| {
                state.retries_in_flight = state.retries_in_flight.saturating_sub(1);
            });
        }

        if shared.shutdown.load(Ordering::SeqCst) {
            shared.frontier.visited.finalize(task.key());
            shared.task_done(tx);
            return;
        }

        match shared.frontier.admit(&task) {
            Ok(()) => {
                workers.spawn(process_task(Arc::clone(shared), task, tx.clone()));
            }
            Err(reason) => {
                debug!("Rejected {} ({})", task.url, reason);
                shared.stats.record_rejection(&task.domain, reason.label());
                if task.is_retry() {
                    // a retry was already in flight in the visited index;
                    // rejection resolves it terminally
                    shared.frontier.visited.finalize(task.key());
                    shared.frontier.retries.clear(task.key());
                }
                shared.task_done(tx);
            }
        }
    }
}

/// Worker body: fetch one admitted task, then balance the counter.
async fn process_task(
    shared: Arc<EngineShared>,
    task: CrawlTask,
    tx: UnboundedSender<QueueEvent>,
) {
    run_fetch(&shared, &task, &tx).await;
    shared.task_done(&tx);
}

async fn run_fetch(
    shared: &Arc<EngineShared>,
    task: &CrawlTask,
    tx: &UnboundedSender<QueueEvent>,
) {
    let global = match Arc::clone(&shared.global_slots).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return,
    };
    let domain_permit = match shared.ledger.fetch_slots(&task.domain).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return,
    };
    let _permits = (global, domain_permit);

    let slot = shared.pacer.reserve(&task.domain);
    tokio::time::sleep_until(tokio::time::Instant::from_std(slot)).await;

    if shared.shutdown.load(Ordering::SeqCst) {
        shared.frontier.visited.finalize(task.key());
        return;
    }

    debug!(
        "Fetching {} (depth {}, attempt {})",
        task.url, task.depth, task.attempt
    );
    match shared.fetcher.fetch(&task.url).await {
        FetchOutcome::Success {
            final_url,
            status_code,
            content_type,
            body,
        } => {
            debug!(
                "Fetched {} (HTTP {}, {} bytes)",
                task.url,
                status_code,
                body.len()
            );
            shared.complete(task, final_url, content_type, body, tx).await;
        }
        FetchOutcome::Oversize { size, limit } => {
            warn!(
                "Dropping oversize body from {}: {} > {} bytes",
                task.url, size, limit
            );
            shared.stats.record_oversize(&task.domain);
            shared.finish_task(task);
        }
        FetchOutcome::Failure { kind, retryable } => {
            shared.handle_failure(task, kind, retryable, tx);
        }
    }
}

impl EngineShared {
    /// Adds a task to the queue, taking a unit of outstanding work.
    fn enqueue(&self, tx: &UnboundedSender<QueueEvent>, task: CrawlTask) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if tx.send(QueueEvent::Task(task)).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Releases a unit of outstanding work; the last release ends the run.
    fn task_done(&self, tx: &UnboundedSender<QueueEvent>) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = tx.send(QueueEvent::Drained);
        }
    }

    /// Completion pipeline for a successful fetch.
    async fn complete(
        &self,
        task: &CrawlTask,
        final_url: Url,
        content_type: String,
        body: Vec<u8>,
        tx: &UnboundedSender<QueueEvent>,
    ) {
        // redirects can land outside the allowed scope
        let in_scope = final_url
            .host_str()
            .map(|host| self.scope.in_scope(host))
            .unwrap_or(false);
        if !in_scope {
            debug!("Redirect left scope: {} -> {}", task.url, final_url);
            self.stats.record_rejection(&task.domain, "out-of-scope");
            self.finish_task(task);
            return;
        }

        let html = is_html(&content_type);
        let traverse = task.kind == TaskKind::Page && html;

        if traverse && !self.frontier.content.insert(&body) {
            debug!("Duplicate content dropped: {}", task.url);
            self.stats.record_duplicate(&task.domain);
            self.finish_task(task);
            return;
        }

        // a page task that came back non-HTML is kept only when the type
        // policy would have admitted it as an asset
        if task.kind == TaskKind::Page && !html && !self.downloadable(&final_url, &content_type) {
            debug!(
                "Dropping non-HTML page response: {} ({})",
                task.url, content_type
            );
            self.stats.record_rejection(&task.domain, "type");
            self.finish_task(task);
            return;
        }

        let rel_path = artifact_rel_path(&final_url, &content_type);
        if let Err(error) = self.store.write(&rel_path, &body).await {
            warn!("Failed to store {}: {}", task.url, error);
            self.stats
                .record_failure(&task.domain, task.key(), &format!("storage: {}", error));
            self.finish_task(task);
            return;
        }

        let parsed = if traverse {
            Some(parse_page(&String::from_utf8_lossy(&body), &final_url))
        } else {
            None
        };

        let entry = ManifestEntry {
            file_path: rel_path.to_string_lossy().into_owned(),
            hash: sha256_hex(&body),
            content_type: content_type_essence(&content_type),
            title: parsed
                .as_ref()
                .and_then(|page| page.title.clone())
                .unwrap_or_default(),
            depth: task.depth,
            timestamp: Utc::now().to_rfc3339(),
            size: body.len() as u64,
        };
        if let Err(error) = self.manifests.record(&task.domain, task.key(), entry).await {
            warn!("Failed to record manifest entry for {}: {}", task.url, error);
        }

        if traverse {
            self.frontier.quota.increment(&task.domain);
            self.stats.record_page(&task.domain);
            info!("Stored page {} (depth {})", task.url, task.depth);
        } else {
            self.stats.record_asset(&task.domain);
            info!("Stored asset {}", task.url);
        }

        if let Some(parsed) = parsed {
            if !self.shutdown.load(Ordering::SeqCst) {
                self.discover(task, parsed, tx);
            }
        }

        self.finish_task(task);
    }

    /// Queues every link and asset found on a stored page.
    fn discover(&self, task: &CrawlTask, parsed: ParsedPage, tx: &UnboundedSender<QueueEvent>) {
        let next_depth = task.depth + 1;
        let referrer = Some(task.key().to_string());

        for link in parsed.links {
            let canon = match canonicalize(link.as_str(), None) {
                Ok(url) => url,
                Err(_) => continue,
            };
            let kind = if self.link_is_download(&canon) {
                TaskKind::Asset
            } else {
                TaskKind::Page
            };
            if let Ok(child) = CrawlTask::new(canon, kind, next_depth, referrer.clone()) {
                self.enqueue(tx, child);
            }
        }

        for asset in parsed.assets {
            let canon = match canonicalize(asset.as_str(), None) {
                Ok(url) => url,
                Err(_) => continue,
            };
            if let Ok(child) = CrawlTask::new(canon, TaskKind::Asset, next_depth, referrer.clone())
            {
                self.enqueue(tx, child);
            }
        }
    }

    /// Routes a fetch failure to retry or terminal resolution.
    fn handle_failure(
        &self,
        task: &CrawlTask,
        kind: FailureKind,
        retryable: bool,
        tx: &UnboundedSender<QueueEvent>,
    ) {
        let reason = kind.to_string();

        if retryable && !self.shutdown.load(Ordering::SeqCst) {
            match self.frontier.retries.record_failure(task.key(), &reason) {
                RetryDecision::Retry { attempt, delay } => {
                    let pending = self.ledger.with(&task.domain, |state| {
                        state.retries_in_flight += 1;
                        state.retries_in_flight
                    });
                    warn!(
                        "Fetch failed for {} ({}); retry {} of {} in {:?} ({} pending for {})",
                        task.url,
                        reason,
                        attempt,
                        self.config.retry.max_retries,
                        delay,
                        pending,
                        task.domain
                    );
                    self.stats.record_retry(&task.domain);
                    self.schedule_retry(task.retry(attempt), delay, tx);
                }
                RetryDecision::Abandon { attempts, reason } => {
                    warn!("Abandoning {} after {} attempts: {}", task.url, attempts, reason);
                    self.stats.record_failure(&task.domain, task.key(), &reason);
                    self.frontier.visited.finalize(task.key());
                }
            }
        } else {
            warn!("Fetch failed terminally for {}: {}", task.url, reason);
            self.stats.record_failure(&task.domain, task.key(), &reason);
            self.frontier.visited.finalize(task.key());
            self.frontier.retries.clear(task.key());
        }
    }

    /// Re-queues a retry after its delay, holding outstanding work the
    /// whole time so the run cannot end underneath it.
    fn schedule_retry(&self, task: CrawlTask, delay: Duration, tx: &UnboundedSender<QueueEvent>) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The send only fails once the run loop has already ended.
            let _ = tx.send(QueueEvent::Task(task));
        });
    }

    /// Terminal bookkeeping shared by every completion path.
    fn finish_task(&self, task: &CrawlTask) {
        self.frontier.visited.finalize(task.key());
        self.frontier.retries.clear(task.key());
    }

    /// Whether the type policy admits this response as an asset download.
    fn downloadable(&self, url: &Url, content_type: &str) -> bool {
        let types = &self.config.crawl.download_file_types;
        let by_type = crate::storage::extension_for(content_type)
            .map(|ext| types.iter().any(|t| t.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        let by_url = extension_of(url)
            .map(|ext| types.iter().any(|t| t.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false);
        by_type || by_url
    }

    /// Whether a discovered link's extension marks it as a download.
    fn link_is_download(&self, url: &Url) -> bool {
        extension_of(url)
            .map(|ext| {
                self.config
                    .crawl
                    .download_file_types
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }
}
