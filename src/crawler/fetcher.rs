//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with timeouts and compression
//! - Per-request user agent selection
//! - Body size caps
//! - Error classification into transient and terminal failures

use std::fmt;

use rand::seq::SliceRandom;
use reqwest::{header, redirect::Policy, Client};
use url::Url;

use crate::config::{Config, TimeoutConfig, UserAgentConfig};

/// HTTP statuses treated as transient and routed to retry.
const RETRYABLE_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Browser user agents rotated through when identification is disabled.
const BROWSER_USER_AGENTS: [&str; 8] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/91.0.864.59",
];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response with a body within the size cap
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Response body
        body: Vec<u8>,
    },

    /// The fetch failed; `retryable` routes transient failures to retry
    Failure { kind: FailureKind, retryable: bool },

    /// The body exceeded the configured size cap
    Oversize { size: u64, limit: u64 },
}

/// Classified fetch failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The request exceeded a configured timeout
    Timeout,
    /// TCP or TLS connection could not be established
    Connect,
    /// Non-2xx HTTP status
    Http(u16),
    /// Any other request error (body read, redirect loop, protocol)
    Request(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timeout"),
            Self::Connect => write!(f, "connection failed"),
            Self::Http(status) => write!(f, "HTTP {}", status),
            Self::Request(error) => write!(f, "{}", error),
        }
    }
}

/// Whether an HTTP status is worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS.contains(&status)
}

/// Builds the HTTP client shared by all fetches
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeouts` - Connect and whole-request timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use tidepool::config::{TimeoutConfig, UserAgentConfig};
/// use tidepool::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "Tidepool".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
///     rotate: false,
/// };
///
/// let client = build_http_client(&user_agent, &TimeoutConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeouts: &TimeoutConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeouts.request())
        .connect_timeout(timeouts.connect())
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues crawl requests and classifies their outcomes.
pub struct Fetcher {
    client: Client,
    rotate_user_agents: bool,
    max_body_bytes: u64,
}

impl Fetcher {
    /// Creates a fetcher from the run configuration.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, &config.timeouts)?;
        Ok(Self {
            client,
            rotate_user_agents: config.user_agent.rotate,
            max_body_bytes: config.crawl.max_file_size_bytes(),
        })
    }

    /// Fetches `url` and classifies the result.
    ///
    /// Bodies are rejected as oversize either up front via Content-Length
    /// or after download when the header was absent or wrong. Redirects
    /// are followed up to 10 hops; the final URL is reported alongside
    /// the body.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let mut request = self.client.get(url.clone());
        if self.rotate_user_agents {
            if let Some(agent) = BROWSER_USER_AGENTS.choose(&mut rand::thread_rng()) {
                request = request.header(header::USER_AGENT, *agent);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => return classify_error(&error),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::Failure {
                kind: FailureKind::Http(status.as_u16()),
                retryable: is_retryable_status(status.as_u16()),
            };
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes {
                return FetchOutcome::Oversize {
                    size: length,
                    limit: self.max_body_bytes,
                };
            }
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        match response.bytes().await {
            Ok(body) => {
                if body.len() as u64 > self.max_body_bytes {
                    return FetchOutcome::Oversize {
                        size: body.len() as u64,
                        limit: self.max_body_bytes,
                    };
                }
                FetchOutcome::Success {
                    final_url,
                    status_code: status.as_u16(),
                    content_type,
                    body: body.to_vec(),
                }
            }
            Err(error) => classify_error(&error),
        }
    }
}

/// Classifies a reqwest error into a failure kind.
///
/// Network-level errors are all considered transient; the retry ceiling
/// bounds how often they are re-attempted.
fn classify_error(error: &reqwest::Error) -> FetchOutcome {
    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_connect() {
        FailureKind::Connect
    } else {
        FailureKind::Request(error.to_string())
    };
    FetchOutcome::Failure {
        kind,
        retryable: true,
    }
}
