//! Throughput limiting for the candidate hand-off
//!
//! A token bucket refilled at the configured rate, capped at one second of
//! burst so that a long pause never pays out as a spike on resume.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Sleep granularity while waiting for a refill, so a reset takes effect
/// promptly
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Token-bucket rate limiter shared by all workers of a job
///
/// Built without a limit it is a pass-through and `acquire` never blocks.
pub struct RateLimiter {
    bucket: Option<Mutex<Bucket>>,
}

struct Bucket {
    rate: f64,
    capacity: f64,
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter allowing `candidates_per_sec`, or a pass-through
    pub fn new(candidates_per_sec: Option<f64>) -> Self {
        Self {
            bucket: candidates_per_sec.map(|rate| {
                Mutex::new(Bucket {
                    rate,
                    capacity: rate.max(1.0),
                    tokens: 0.0,
                    last_refill: Instant::now(),
                })
            }),
        }
    }

    /// Block until `n` permits are available
    ///
    /// A request larger than the bucket can ever hold is clamped to the
    /// capacity, so it drains a full bucket instead of waiting forever.
    pub fn acquire(&self, n: u32) {
        let Some(bucket) = &self.bucket else { return };
        loop {
            let wait = {
                let mut bucket = bucket.lock();
                bucket.refill();
                let need = f64::from(n).min(bucket.capacity);
                if bucket.tokens >= need {
                    bucket.tokens -= need;
                    return;
                }
                Duration::from_secs_f64((need - bucket.tokens) / bucket.rate)
            };
            std::thread::sleep(wait.min(WAIT_SLICE));
        }
    }

    /// Drop accrued permits and restart the refill clock
    ///
    /// Called on resume: paused time must not accrue token debt.
    pub fn reset(&self) {
        if let Some(bucket) = &self.bucket {
            let mut bucket = bucket.lock();
            bucket.tokens = 0.0;
            bucket.last_refill = Instant::now();
        }
    }

    /// Whether a limit is configured
    pub fn is_limited(&self) -> bool {
        self.bucket.is_some()
    }
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }
}
