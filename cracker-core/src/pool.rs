//! Fixed-size worker pool that drives a scan
//!
//! One reader thread streams candidates into a bounded crossbeam channel; N
//! worker threads pull through the rate limiter, hash, and compare. The only
//! shared mutable state is the processed counter, the match slot, and the
//! cooperative control signal. The match slot is a claim-once cell: the first
//! successful claim wins and stops the pool.

use crate::hasher;
use crate::limiter::RateLimiter;
use crate::wordlist::{Candidate, Candidates};
use crate::Error;
use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Candidates buffered between the reader and the workers
pub const HANDOFF_CAPACITY: usize = 1024;

/// Worker failures tolerated within [`FAILURE_WINDOW`] before the scan aborts
pub const FAILURE_LIMIT: usize = 3;

/// Sliding window over which worker failures are counted
pub const FAILURE_WINDOW: Duration = Duration::from_secs(10);

/// How long the reader waits on a full channel before re-checking control
const SEND_POLL: Duration = Duration::from_millis(50);

/// The winning candidate, installed at most once per job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub candidate: String,
    pub index: u64,
    pub roll: f64,
}

/// Cooperative control signal checked between candidates
///
/// Pausing and stopping never interrupt an in-flight hash computation; they
/// only gate the next pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Run,
    Pause,
    Stop,
}

struct Control {
    state: Mutex<Signal>,
    condvar: Condvar,
}

impl Control {
    fn new() -> Self {
        Self {
            state: Mutex::new(Signal::Run),
            condvar: Condvar::new(),
        }
    }

    /// Blocks while paused; returns false once stopped
    fn checkpoint(&self) -> bool {
        let mut state = self.state.lock();
        while *state == Signal::Pause {
            self.condvar.wait(&mut state);
        }
        *state != Signal::Stop
    }
}

/// Immutable hash inputs shared by every worker
pub struct ScanParams {
    target_hash: String,
    client_seed: String,
    nonce: u64,
}

impl ScanParams {
    pub fn new(target_hash: &str, client_seed: &str, nonce: u64) -> Self {
        Self {
            target_hash: target_hash.to_ascii_lowercase(),
            client_seed: client_seed.to_string(),
            nonce,
        }
    }
}

/// State shared between the reader, the workers, and the controller
pub struct ScanState {
    processed: AtomicU64,
    failure_total: AtomicU64,
    match_slot: OnceLock<Match>,
    control: Control,
    failures: Mutex<VecDeque<Instant>>,
    fault: Mutex<Option<Error>>,
}

impl ScanState {
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            failure_total: AtomicU64::new(0),
            match_slot: OnceLock::new(),
            control: Control::new(),
            failures: Mutex::new(VecDeque::new()),
            fault: Mutex::new(None),
        }
    }

    /// Candidates whose processing has completed, in no particular order
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Total worker failures over the life of the scan
    pub fn failure_total(&self) -> u64 {
        self.failure_total.load(Ordering::Relaxed)
    }

    pub fn pause(&self) {
        *self.control.state.lock() = Signal::Pause;
        self.control.condvar.notify_all();
    }

    pub fn resume(&self) {
        let mut state = self.control.state.lock();
        if *state == Signal::Pause {
            *state = Signal::Run;
        }
        self.control.condvar.notify_all();
    }

    pub fn stop(&self) {
        *self.control.state.lock() = Signal::Stop;
        self.control.condvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.control.state.lock() == Signal::Stop
    }

    /// Single-winner claim: true only for the first caller
    ///
    /// A successful claim stops the pool so other workers cease pulling.
    fn claim(&self, m: Match) -> bool {
        let won = self.match_slot.set(m).is_ok();
        if won {
            self.stop();
        }
        won
    }

    pub fn matched(&self) -> Option<Match> {
        self.match_slot.get().cloned()
    }

    /// Record a worker failure; true means the window overflowed and the scan
    /// has been escalated to a fatal error
    fn record_failure(&self, err: &Error) -> bool {
        self.failure_total.fetch_add(1, Ordering::Relaxed);
        warn!("Worker failure treated as non-match: {}", err);

        let now = Instant::now();
        let mut failures = self.failures.lock();
        failures.push_back(now);
        while let Some(front) = failures.front() {
            if now.duration_since(*front) > FAILURE_WINDOW {
                failures.pop_front();
            } else {
                break;
            }
        }
        if failures.len() >= FAILURE_LIMIT {
            self.set_fault(Error::Internal(format!(
                "{} worker failures within {:?}, hash path looks broken",
                failures.len(),
                FAILURE_WINDOW
            )));
            self.stop();
            return true;
        }
        false
    }

    fn set_fault(&self, err: Error) {
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(err);
        }
    }

    pub fn take_fault(&self) -> Option<Error> {
        self.fault.lock().take()
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a scan stopped
#[derive(Debug)]
pub enum Outcome {
    /// A worker's claim succeeded
    Found(Match),
    /// The wordlist ran out with no claim
    Exhausted,
    /// The stop signal arrived before exhaustion
    Stopped,
    /// Ingestion failed mid-stream or the failure window overflowed
    Failed(Error),
}

/// Run a scan to completion on the calling thread
///
/// Spawns the reader and `workers` scan threads, joins them all, and reports
/// why the scan ended. Every candidate is processed by exactly one worker.
pub fn run(
    source: Candidates,
    params: &ScanParams,
    state: &ScanState,
    limiter: &RateLimiter,
    workers: usize,
) -> Outcome {
    let (tx, rx) = channel::bounded::<Candidate>(HANDOFF_CAPACITY);

    std::thread::scope(|scope| {
        scope.spawn(|| reader_loop(source, tx, state));
        for id in 0..workers {
            let rx = rx.clone();
            scope.spawn(move || worker_loop(id, rx, params, state, limiter));
        }
        // The local receiver would keep the channel connected after the
        // reader finishes
        drop(rx);
    });

    if let Some(m) = state.matched() {
        return Outcome::Found(m);
    }
    if let Some(e) = state.take_fault() {
        return Outcome::Failed(e);
    }
    if state.is_stopped() {
        Outcome::Stopped
    } else {
        Outcome::Exhausted
    }
}

/// Streams candidates into the hand-off channel in strictly increasing index
/// order
fn reader_loop(source: Candidates, tx: Sender<Candidate>, state: &ScanState) {
    for item in source {
        if !state.control.checkpoint() {
            return;
        }
        let candidate = match item {
            Ok(c) => c,
            Err(e) => {
                state.set_fault(e);
                state.stop();
                return;
            }
        };
        let mut pending = candidate;
        loop {
            match tx.send_timeout(pending, SEND_POLL) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(c)) => {
                    // Re-check control so a stopped pool never wedges the
                    // reader on a full channel
                    if !state.control.checkpoint() {
                        return;
                    }
                    pending = c;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
    debug!("Wordlist exhausted, reader done");
}

fn worker_loop(
    id: usize,
    rx: Receiver<Candidate>,
    params: &ScanParams,
    state: &ScanState,
    limiter: &RateLimiter,
) {
    loop {
        if !state.control.checkpoint() {
            return;
        }
        limiter.acquire(1);
        // Disconnect means the reader is done and the buffer has drained
        let candidate = match rx.recv() {
            Ok(c) => c,
            Err(_) => return,
        };

        match hasher::matches(
            &candidate.value,
            &params.client_seed,
            params.nonce,
            &params.target_hash,
        ) {
            Ok(true) => {
                state.processed.fetch_add(1, Ordering::Relaxed);
                let roll =
                    match hasher::dice_roll(&candidate.value, &params.client_seed, params.nonce) {
                        Ok(roll) => roll,
                        Err(e) => {
                            warn!("Roll derivation failed for winning seed: {}", e);
                            0.0
                        }
                    };
                let index = candidate.index;
                if state.claim(Match {
                    candidate: candidate.value,
                    index,
                    roll,
                }) {
                    info!(worker = id, index, "Match claimed");
                } else {
                    debug!(worker = id, index, "Match found but claim lost");
                }
            }
            Ok(false) => {
                state.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // Counted as a processed non-match; repeated failures abort
                state.processed.fetch_add(1, Ordering::Relaxed);
                if state.record_failure(&e) {
                    return;
                }
            }
        }
    }
}
