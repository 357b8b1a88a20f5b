use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tidepool
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl scope and volume configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Seed URLs the crawl starts from
    pub seeds: Vec<String>,

    /// Domains the crawl is allowed to stay within
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// Regex patterns; matching URLs are never admitted
    #[serde(rename = "exclude-patterns", default)]
    pub exclude_patterns: Vec<String>,

    /// Page extensions admitted for HTML traversal beyond the implicit
    /// html/htm (e.g. "php", "asp")
    #[serde(rename = "page-types", default)]
    pub page_types: Vec<String>,

    /// Extensions admitted for asset downloads (e.g. "pdf", "jpg")
    #[serde(rename = "download-file-types", default)]
    pub download_file_types: Vec<String>,

    /// Maximum discovery depth from a seed URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum successfully processed pages per domain
    #[serde(rename = "max-pages-per-domain", default = "default_max_pages")]
    pub max_pages_per_domain: u32,

    /// Largest body accepted for storage, in megabytes
    #[serde(rename = "max-file-size-mb", default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl CrawlConfig {
    /// Body size ceiling in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// Per-domain dispatch pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Lower bound of the jittered base delay (milliseconds)
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the base delay and hard cap on the scaled delay
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Scale the delay with the domain's cumulative request count
    #[serde(default = "default_true")]
    pub progressive: bool,
}

impl PolitenessConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            progressive: true,
        }
    }
}

/// Transient-failure retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retry attempts after the first failure before a URL is abandoned
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause before a retry re-enters dispatch (seconds)
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl RetryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Concurrency ceilings
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Fetches in flight across the whole run
    #[serde(rename = "global-concurrency", default = "default_global_concurrency")]
    pub global_concurrency: usize,

    /// Fetches in flight against any single domain
    #[serde(
        rename = "per-domain-concurrency",
        default = "default_per_domain_concurrency"
    )]
    pub per_domain_concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            global_concurrency: default_global_concurrency(),
            per_domain_concurrency: default_per_domain_concurrency(),
        }
    }
}

/// HTTP timeout configuration; connect and total-request are independent
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// TCP/TLS connection establishment timeout (seconds)
    #[serde(rename = "connect-secs", default = "default_connect_secs")]
    pub connect_secs: u64,

    /// Whole-request timeout including the body (seconds)
    #[serde(rename = "request-secs", default = "default_request_secs")]
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            request_secs: default_request_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,

    /// Rotate through a built-in browser User-Agent list instead of the
    /// identifying string above
    #[serde(default)]
    pub rotate: bool,
}

impl UserAgentConfig {
    /// Renders the identifying User-Agent header value.
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output location configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for stored artifacts and per-domain manifests
    #[serde(rename = "root-dir")]
    pub root_dir: String,

    /// Path to the run summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    100
}

fn default_max_file_size_mb() -> u64 {
    50
}

fn default_min_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_global_concurrency() -> usize {
    16
}

fn default_per_domain_concurrency() -> usize {
    8
}

fn default_connect_secs() -> u64 {
    10
}

fn default_request_secs() -> u64 {
    30
}
