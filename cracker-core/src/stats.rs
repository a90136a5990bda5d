// SPDX-License-Identifier: MIT
//
// Seed Cracker: wordlist-driven recovery of provably-fair server seeds

//! Engine-wide counters
//!
//! Plain atomic counters shared across jobs for logging and CLI display.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide engine statistics
#[derive(Clone)]
pub struct EngineStats {
    inner: Arc<StatsInner>,
}

struct StatsInner {
    start_time: Instant,
    jobs_submitted: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    candidates_hashed: AtomicU64,
    matches_found: AtomicU64,
    worker_failures: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub uptime_seconds: u64,
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub candidates_hashed: u64,
    pub matches_found: u64,
    pub worker_failures: u64,
    pub hash_rate: f64,
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                start_time: Instant::now(),
                jobs_submitted: AtomicU64::new(0),
                jobs_completed: AtomicU64::new(0),
                jobs_failed: AtomicU64::new(0),
                candidates_hashed: AtomicU64::new(0),
                matches_found: AtomicU64::new(0),
                worker_failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_submitted(&self) {
        self.inner.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.inner.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.inner.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_candidates(&self, n: u64) {
        self.inner.candidates_hashed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.inner.matches_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_failures(&self, n: u64) {
        self.inner.worker_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn candidates_hashed(&self) -> u64 {
        self.inner.candidates_hashed.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    pub fn report(&self) -> StatsReport {
        let uptime = self.inner.start_time.elapsed().as_secs_f64();
        let hashed = self.candidates_hashed();
        StatsReport {
            uptime_seconds: uptime as u64,
            jobs_submitted: self.inner.jobs_submitted.load(Ordering::Relaxed),
            jobs_completed: self.inner.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.inner.jobs_failed.load(Ordering::Relaxed),
            candidates_hashed: hashed,
            matches_found: self.inner.matches_found.load(Ordering::Relaxed),
            worker_failures: self.inner.worker_failures.load(Ordering::Relaxed),
            hash_rate: if uptime > 0.0 {
                hashed as f64 / uptime
            } else {
                0.0
            },
        }
    }
}
