use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Per-URL failure bookkeeping
#[derive(Debug, Clone)]
pub struct RetryRecord {
    /// Failures seen so far, counting the first attempt
    pub attempts: u32,

    /// Human-readable reason of the most recent failure
    pub last_error: String,
}

/// Outcome of recording a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-dispatch after the delay; `attempt` numbers the upcoming retry
    Retry { attempt: u32, delay: Duration },

    /// Retry budget spent; the URL is terminally failed
    Abandon { attempts: u32, reason: String },
}

/// Coordinates transient-failure retries per canonical URL
///
/// A URL moves from untracked through `attempts = 1..=max_retries` failures
/// (each answered with a Retry decision) to abandonment on the failure after
/// that. One lock guards the map, so concurrent failure reports for the same
/// URL serialize and the attempt count never skips or repeats. Records are
/// dropped on success or abandonment; an abandoned URL can only be decided
/// once.
#[derive(Debug)]
pub struct RetryCoordinator {
    max_retries: u32,
    retry_delay: Duration,
    records: Mutex<HashMap<String, RetryRecord>>,
}

impl RetryCoordinator {
    /// # Arguments
    ///
    /// * `max_retries` - Retries allowed after the initial attempt
    /// * `retry_delay` - Pause before a retry re-enters dispatch
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Records one failure and decides what happens to the URL.
    pub fn record_failure(&self, url: &str, reason: &str) -> RetryDecision {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(url.to_string()).or_insert(RetryRecord {
            attempts: 0,
            last_error: String::new(),
        });

        record.attempts += 1;
        record.last_error = reason.to_string();

        if record.attempts <= self.max_retries {
            RetryDecision::Retry {
                attempt: record.attempts,
                delay: self.retry_delay,
            }
        } else {
            let attempts = record.attempts;
            records.remove(url);
            RetryDecision::Abandon {
                attempts,
                reason: reason.to_string(),
            }
        }
    }

    /// Drops the record after a successful fetch.
    pub fn clear(&self, url: &str) {
        self.records.lock().unwrap().remove(url);
    }

    /// Attempts recorded for a URL, if it is being tracked.
    pub fn attempts(&self, url: &str) -> Option<u32> {
        self.records.lock().unwrap().get(url).map(|r| r.attempts)
    }

    /// URLs currently tracked between failure and retry.
    pub fn tracked(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}
