use crate::url::domain_of;
use crate::UrlError;
use url::Url;

/// What a task fetches: an HTML page to traverse, or a linked asset to
/// download and store as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Page,
    Asset,
}

/// One unit of crawl work: a canonical URL awaiting dispatch.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// Canonical URL to fetch
    pub url: Url,

    /// Lowercase host, derived once at construction
    pub domain: String,

    /// Canonical URL of the page this one was discovered on
    pub referrer: Option<String>,

    /// Link distance from the seed that led here (seeds are depth 0)
    pub depth: u32,

    /// Page traversal or asset download
    pub kind: TaskKind,

    /// 0 for the first dispatch; n for the n-th retry
    pub attempt: u32,
}

impl CrawlTask {
    /// Builds a task from an already-canonical URL.
    ///
    /// # Arguments
    ///
    /// * `url` - Canonical URL (see [`crate::url::canonicalize`])
    /// * `kind` - Page traversal or asset download
    /// * `depth` - Discovery depth
    /// * `referrer` - Canonical URL of the discovering page, if any
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlTask)` - Task ready for admission
    /// * `Err(UrlError)` - The URL carries no host
    pub fn new(
        url: Url,
        kind: TaskKind,
        depth: u32,
        referrer: Option<String>,
    ) -> Result<Self, UrlError> {
        let domain = domain_of(&url).ok_or(UrlError::MissingHost)?;
        Ok(Self {
            url,
            domain,
            referrer,
            depth,
            kind,
            attempt: 0,
        })
    }

    /// Builds a depth-0 page task for a seed URL.
    pub fn seed(url: Url) -> Result<Self, UrlError> {
        Self::new(url, TaskKind::Page, 0, None)
    }

    /// Clones this task as its n-th retry.
    pub fn retry(&self, attempt: u32) -> Self {
        let mut task = self.clone();
        task.attempt = attempt;
        task
    }

    /// Whether this task re-entered dispatch through the retry path.
    pub fn is_retry(&self) -> bool {
        self.attempt > 0
    }

    /// The canonical string key this task is tracked under.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }
}
