//! Crawler module for web page fetching and processing
//!
//! This module contains the crawl engine and its collaborators:
//! - HTTP fetching with failure classification
//! - HTML parsing and link/asset extraction
//! - Per-domain dispatch pacing
//! - The run loop that ties admission, fetch, and storage together

mod engine;
mod fetcher;
mod parser;
mod politeness;

pub use engine::CrawlEngine;
pub use fetcher::{build_http_client, FailureKind, FetchOutcome, Fetcher};
pub use parser::{parse_page, ParsedPage};
pub use politeness::Pacer;
