//! Per-domain request pacing
//!
//! Every dispatch to a domain reserves a time slot under that domain's
//! lock: the slot is the later of now and the previous slot plus the
//! computed delay. Concurrent workers targeting the same domain therefore
//! hold distinct, correctly spaced slots before any of them starts
//! sleeping, and the minimum spacing holds regardless of interleaving.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::PolitenessConfig;
use crate::state::DomainLedger;

/// Computes and reserves per-domain dispatch slots.
pub struct Pacer {
    ledger: Arc<DomainLedger>,
    min_delay: Duration,
    max_delay: Duration,
    progressive: bool,
}

impl Pacer {
    /// Creates a pacer over the shared domain ledger.
    pub fn new(ledger: Arc<DomainLedger>, config: &PolitenessConfig) -> Self {
        Self {
            ledger,
            min_delay: config.min_delay(),
            max_delay: config.max_delay(),
            progressive: config.progressive,
        }
    }

    /// Reserves the next dispatch slot for `domain` and returns it.
    ///
    /// The delay is drawn uniformly from the configured range, scaled by
    /// the progressive factor for domains that have already seen traffic,
    /// and capped at the configured maximum. The domain's request count
    /// is read before the reservation bumps it, so the first request sees
    /// a factor of 1.0.
    pub fn reserve(&self, domain: &str) -> Instant {
        let now = Instant::now();
        self.ledger.with(domain, |state| {
            let delay = self.delay_for(state.request_count);
            state.reserve_dispatch(delay, now)
        })
    }

    fn delay_for(&self, request_count: u32) -> Duration {
        let base = self.base_delay();
        if !self.progressive {
            return base;
        }
        base.mul_f64(progressive_factor(request_count))
            .min(self.max_delay)
    }

    fn base_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }
}

/// Throttle factor for a domain that has already seen `request_count`
/// requests: min(1 + 0.1 * n, 2.0).
fn progressive_factor(request_count: u32) -> f64 {
    (1.0 + 0.1 * f64::from(request_count)).min(2.0)
}
