//! State module for per-domain crawl bookkeeping
//!
//! This module provides the domain ledger the engine consults on every
//! dispatch: pacing reservations, quota counters, retry gauges, and the
//! per-domain concurrency semaphores all live here.

mod domain_state;

// Re-export main types
pub use domain_state::{DomainLedger, DomainState};
