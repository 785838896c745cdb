//! Shared counters for the /health endpoint. Written by the query handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Default)]
pub struct HealthState {
    pub requests_served: AtomicU64,
    pub requests_failed: AtomicU64,
    /// Nanosecond timestamp of the last successful query (0 = none).
    pub last_query_at_ns: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        self.last_query_at_ns.store(now_ns(), Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }

    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn last_query_at_ns(&self) -> u64 {
        self.last_query_at_ns.load(Ordering::Relaxed)
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
