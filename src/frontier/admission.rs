use crate::config::CrawlConfig;
use crate::frontier::quota::QuotaTracker;
use crate::frontier::task::{CrawlTask, TaskKind};
use crate::frontier::visited::VisitedIndex;
use crate::url::ScopeList;
use crate::ConfigError;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Why a task was turned away, named after the check that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    DepthExceeded(u32),
    ExcludedPattern,
    OutOfScope(String),
    AlreadyVisited,
    QuotaReached(String),
    DisallowedType(String),
}

impl RejectReason {
    /// Short stable key for per-reason counters.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DepthExceeded(_) => "depth",
            Self::ExcludedPattern => "excluded",
            Self::OutOfScope(_) => "out-of-scope",
            Self::AlreadyVisited => "visited",
            Self::QuotaReached(_) => "quota",
            Self::DisallowedType(_) => "type",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthExceeded(depth) => write!(f, "depth {} exceeds the ceiling", depth),
            Self::ExcludedPattern => write!(f, "matches an exclude pattern"),
            Self::OutOfScope(host) => write!(f, "host {} is outside the crawl scope", host),
            Self::AlreadyVisited => write!(f, "already visited this run"),
            Self::QuotaReached(domain) => write!(f, "domain {} reached its page quota", domain),
            Self::DisallowedType(ext) => write!(f, "extension .{} is not admitted", ext),
        }
    }
}

/// Gatekeeper between link discovery and the dispatch queue
///
/// Checks run in a fixed order and stop at the first failure: depth ceiling,
/// exclude patterns, domain scope, visited index, page quota, type policy.
/// Admission's one side effect is marking the URL in-flight, which doubles
/// as the tie-breaker when the same URL arrives from several pages at once.
/// Retry tasks skip the visited check; they are already in flight.
#[derive(Debug)]
pub struct AdmissionFilter {
    max_depth: u32,
    exclude: Vec<Regex>,
    scope: ScopeList,
    page_types: Vec<String>,
    download_types: Vec<String>,
    visited: Arc<VisitedIndex>,
    quota: Arc<QuotaTracker>,
}

impl AdmissionFilter {
    /// Builds the filter, compiling exclude patterns once.
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl scope and policy configuration
    /// * `visited` - Shared visited index
    /// * `quota` - Shared per-domain quota tracker
    ///
    /// # Returns
    ///
    /// * `Ok(AdmissionFilter)` - Ready to screen tasks
    /// * `Err(ConfigError)` - An exclude pattern failed to compile
    pub fn new(
        config: &CrawlConfig,
        visited: Arc<VisitedIndex>,
        quota: Arc<QuotaTracker>,
    ) -> Result<Self, ConfigError> {
        let exclude = config
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    ConfigError::InvalidPattern(format!("Invalid exclude pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            max_depth: config.max_depth,
            exclude,
            scope: ScopeList::new(&config.allowed_domains),
            page_types: lowercase_all(&config.page_types),
            download_types: lowercase_all(&config.download_file_types),
            visited,
            quota,
        })
    }

    /// Screens one task.
    ///
    /// On `Ok(())` the URL has been marked in-flight and the caller owns its
    /// dispatch. On `Err` the task must be dropped; rejection is silent and
    /// final for this run.
    pub fn admit(&self, task: &CrawlTask) -> Result<(), RejectReason> {
        if task.depth > self.max_depth {
            return Err(RejectReason::DepthExceeded(task.depth));
        }

        let url_str = task.url.as_str();
        if self.exclude.iter().any(|re| re.is_match(url_str)) {
            return Err(RejectReason::ExcludedPattern);
        }

        if !self.scope.in_scope(&task.domain) {
            return Err(RejectReason::OutOfScope(task.domain.clone()));
        }

        if !task.is_retry() && self.visited.contains(task.key()) {
            return Err(RejectReason::AlreadyVisited);
        }

        if !self.quota.is_under_limit(&task.domain) {
            return Err(RejectReason::QuotaReached(task.domain.clone()));
        }

        self.check_type(task)?;

        // Commit of the visited check above: the insert adjudicates races
        // between concurrent admissions of the same URL.
        if !task.is_retry() && !self.visited.begin(task.key()) {
            return Err(RejectReason::AlreadyVisited);
        }

        Ok(())
    }

    /// Type policy on the URL extension, when one is recognizable.
    ///
    /// Extensionless URLs pass; their type is settled by the response
    /// Content-Type after the fetch.
    fn check_type(&self, task: &CrawlTask) -> Result<(), RejectReason> {
        let ext = match extension_of(&task.url) {
            Some(ext) => ext,
            None => return Ok(()),
        };

        let allowed = match task.kind {
            TaskKind::Page => {
                ext == "html" || ext == "htm" || self.page_types.iter().any(|t| *t == ext)
            }
            TaskKind::Asset => self.download_types.iter().any(|t| *t == ext),
        };

        if allowed {
            Ok(())
        } else {
            Err(RejectReason::DisallowedType(ext))
        }
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

/// Extracts a plausible file extension from the final path segment.
///
/// Anything longer than 5 characters or non-alphanumeric is treated as not
/// an extension at all (`/v1.2/report` has none, `/report.pdf` has `pdf`).
pub fn extension_of(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}
