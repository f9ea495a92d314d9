//! Global atomic counters for study runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `tracing::info!`
//! event at the end of a command.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters with no allocation or locking.
pub struct Metrics {
    records_read: AtomicU64,
    malformed_skipped: AtomicU64,
    records_flagged: AtomicU64,
    model_queries: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            records_read: AtomicU64::new(0),
            malformed_skipped: AtomicU64::new(0),
            records_flagged: AtomicU64::new(0),
            model_queries: AtomicU64::new(0),
        }
    }

    /// Add `n` to the records-read counter.
    pub fn add_records_read(&self, n: u64) {
        self.records_read.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "records_read", by = n, "counter incremented");
    }

    /// Add `n` to the malformed-lines-skipped counter.
    pub fn add_malformed_skipped(&self, n: u64) {
        self.malformed_skipped.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "malformed_skipped", by = n, "counter incremented");
    }

    /// Add `n` to the contradiction-flagged counter.
    pub fn add_records_flagged(&self, n: u64) {
        self.records_flagged.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "records_flagged", by = n, "counter incremented");
    }

    /// Increment the model-queries counter by one.
    pub fn inc_model_queries(&self) {
        self.model_queries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "model_queries", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            records_read = self.records_read(),
            malformed_skipped = self.malformed_skipped(),
            records_flagged = self.records_flagged(),
            model_queries = self.model_queries(),
        );
    }

    pub fn records_read(&self) -> u64 {
        self.records_read.load(Ordering::Relaxed)
    }

    pub fn malformed_skipped(&self) -> u64 {
        self.malformed_skipped.load(Ordering::Relaxed)
    }

    pub fn records_flagged(&self) -> u64 {
        self.records_flagged.load(Ordering::Relaxed)
    }

    pub fn model_queries(&self) -> u64 {
        self.model_queries.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.records_read.store(0, Ordering::Relaxed);
        self.malformed_skipped.store(0, Ordering::Relaxed);
        self.records_flagged.store(0, Ordering::Relaxed);
        self.model_queries.store(0, Ordering::Relaxed);
    }
}
