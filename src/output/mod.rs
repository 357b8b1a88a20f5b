//! Output module for run statistics and the end-of-run report
//!
//! This module handles:
//! - Accumulating per-domain counters while the crawl runs
//! - Rendering the markdown run summary
//! - Writing the summary file

mod report;
mod stats;

pub use report::{format_summary, write_summary};
pub use stats::{DomainCounters, FailureEntry, RunStats, RunSummary};
