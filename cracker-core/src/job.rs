//! Job lifecycle: state machine, progress accounting, and the supervisor
//!
//! A job owns its own worker pool and rate limiter. The supervisor thread
//! counts the wordlist, runs the scan, and records the terminal state; the
//! control methods (`pause`, `resume`, `cancel`) are idempotent and return the
//! current status rather than erroring on a no-op.
//!
//! State machine:
//!
//! ```text
//! Pending → Running ⇄ Paused
//!              │
//!              └─→ { Found, Exhausted, Cancelled, Error }   (terminal)
//! ```

use crate::hasher;
use crate::limiter::RateLimiter;
use crate::pool::{self, Match, Outcome, ScanParams, ScanState};
use crate::stats::EngineStats;
use crate::wordlist::Wordlist;
use crate::{Error, ErrorKind, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

/// Job status, serialized for the boundary layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Found,
    Exhausted,
    Cancelled,
    Error,
}

impl JobStatus {
    /// Terminal states admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Found | JobStatus::Exhausted | JobStatus::Cancelled | JobStatus::Error
        )
    }
}

/// Immutable inputs of a job
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub target_hash: String,
    pub client_seed: String,
    pub nonce: u64,
    pub wordlist: Wordlist,
    /// Candidates per second across all workers; unlimited when absent
    pub speed_limit: Option<f64>,
    pub workers: usize,
}

impl JobSpec {
    /// Reject malformed configuration before any job exists
    pub fn validate(&self) -> Result<()> {
        hasher::validate_target_hash(&self.target_hash)?;
        if let Some(limit) = self.speed_limit {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(Error::Config(
                    "speed_limit must be a positive number".to_string(),
                ));
            }
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Terminal error carried in snapshots
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

/// Immutable point-in-time view of a job
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub total: Option<u64>,
    pub elapsed_seconds: f64,
    /// Candidates per second over running time, paused time excluded
    pub speed: f64,
    pub eta_seconds: Option<f64>,
    pub status: JobStatus,
    pub error: Option<ErrorReport>,
}

struct ProgressInner {
    status: JobStatus,
    total: Option<u64>,
    run_started: Option<Instant>,
    accumulated: Duration,
    result: Option<Match>,
    error: Option<ErrorReport>,
}

/// A running (or finished) cracking job
pub struct Job {
    id: Uuid,
    spec: JobSpec,
    state: Arc<ScanState>,
    limiter: Arc<RateLimiter>,
    progress: Mutex<ProgressInner>,
    stats: EngineStats,
}

impl Job {
    /// Validate the spec, create the job, and spawn its supervisor
    pub fn start(spec: JobSpec, stats: EngineStats) -> Result<Arc<Self>> {
        spec.validate()?;
        let limiter = Arc::new(RateLimiter::new(spec.speed_limit));
        let job = Arc::new(Self {
            id: Uuid::new_v4(),
            state: Arc::new(ScanState::new()),
            limiter,
            progress: Mutex::new(ProgressInner {
                status: JobStatus::Pending,
                total: None,
                run_started: None,
                accumulated: Duration::ZERO,
                result: None,
                error: None,
            }),
            stats,
            spec,
        });
        job.stats.record_submitted();

        let supervisor = Arc::clone(&job);
        std::thread::Builder::new()
            .name(format!("job-{}", job.id))
            .spawn(move || supervisor.supervise())?;
        Ok(job)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.progress.lock().status
    }

    /// Pause a running job; no-op otherwise
    ///
    /// Workers finish their current candidate and block before the next pull.
    pub fn pause(&self) -> JobStatus {
        let mut progress = self.progress.lock();
        if progress.status == JobStatus::Running {
            self.state.pause();
            if let Some(started) = progress.run_started.take() {
                progress.accumulated += started.elapsed();
            }
            progress.status = JobStatus::Paused;
            info!(job = %self.id, "Job paused");
        }
        progress.status
    }

    /// Resume a paused job; no-op otherwise
    pub fn resume(&self) -> JobStatus {
        let mut progress = self.progress.lock();
        if progress.status == JobStatus::Paused {
            // Paused time must not pay out as a token burst
            self.limiter.reset();
            self.state.resume();
            progress.run_started = Some(Instant::now());
            progress.status = JobStatus::Running;
            info!(job = %self.id, "Job resumed");
        }
        progress.status
    }

    /// Request cancellation; the terminal state lands once the pool drains
    pub fn cancel(&self) -> JobStatus {
        let progress = self.progress.lock();
        if !progress.status.is_terminal() {
            self.state.stop();
            info!(job = %self.id, "Job cancellation requested");
        }
        progress.status
    }

    /// Point-in-time progress view; never blocks beyond a short lock
    pub fn snapshot(&self) -> ProgressSnapshot {
        let progress = self.progress.lock();
        let processed = self.state.processed();
        let elapsed = progress.accumulated
            + progress
                .run_started
                .map_or(Duration::ZERO, |started| started.elapsed());
        let elapsed_seconds = elapsed.as_secs_f64();
        let speed = if elapsed_seconds > 0.0 {
            processed as f64 / elapsed_seconds
        } else {
            0.0
        };
        let eta_seconds = match progress.total {
            Some(total) if speed > 0.0 && !progress.status.is_terminal() => {
                Some(total.saturating_sub(processed) as f64 / speed)
            }
            _ => None,
        };
        ProgressSnapshot {
            processed,
            total: progress.total,
            elapsed_seconds,
            speed,
            eta_seconds,
            status: progress.status,
            error: progress.error.clone(),
        }
    }

    /// The winning match, available once the job is terminal
    pub fn result(&self) -> Option<Match> {
        let progress = self.progress.lock();
        if progress.status.is_terminal() {
            progress.result.clone()
        } else {
            None
        }
    }

    /// Supervisor body: count, scan, record the terminal state
    fn supervise(self: Arc<Self>) {
        info!(job = %self.id, wordlist = %self.spec.wordlist.path().display(), "Counting candidates");
        let (total, source) = match self.spec.wordlist.counted_candidates() {
            Ok(pair) => pair,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        {
            let mut progress = self.progress.lock();
            progress.total = Some(total);
            progress.status = JobStatus::Running;
            progress.run_started = Some(Instant::now());
        }
        info!(
            job = %self.id,
            total,
            workers = self.spec.workers,
            speed_limit = ?self.spec.speed_limit,
            "Job running"
        );

        let params = ScanParams::new(&self.spec.target_hash, &self.spec.client_seed, self.spec.nonce);
        let outcome = pool::run(source, &params, &self.state, &self.limiter, self.spec.workers);

        self.stats.record_candidates(self.state.processed());
        self.stats.record_worker_failures(self.state.failure_total());

        let mut progress = self.progress.lock();
        if let Some(started) = progress.run_started.take() {
            progress.accumulated += started.elapsed();
        }
        match outcome {
            Outcome::Found(m) => {
                info!(job = %self.id, index = m.index, "Server seed recovered");
                progress.status = JobStatus::Found;
                progress.result = Some(m);
                self.stats.record_match();
                self.stats.record_completed();
            }
            Outcome::Exhausted => {
                info!(job = %self.id, processed = self.state.processed(), "Wordlist exhausted, no match");
                progress.status = JobStatus::Exhausted;
                self.stats.record_completed();
            }
            Outcome::Stopped => {
                info!(job = %self.id, "Job cancelled");
                progress.status = JobStatus::Cancelled;
                self.stats.record_completed();
            }
            Outcome::Failed(e) => {
                error!(job = %self.id, kind = ?e.kind(), "Job failed: {}", e);
                progress.status = JobStatus::Error;
                progress.error = Some(ErrorReport {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                self.stats.record_failed();
            }
        }
    }

    fn fail(&self, e: Error) {
        error!(job = %self.id, kind = ?e.kind(), "Job failed: {}", e);
        let mut progress = self.progress.lock();
        if let Some(started) = progress.run_started.take() {
            progress.accumulated += started.elapsed();
        }
        progress.status = JobStatus::Error;
        progress.error = Some(ErrorReport {
            kind: e.kind(),
            message: e.to_string(),
        });
        self.stats.record_failed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn wordlist_of(lines: &[&str]) -> (tempfile::TempPath, Wordlist) {
        let mut file = tempfile::Builder::new()
            .suffix(".txt")
            .tempfile()
            .unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        let path = file.into_temp_path();
        let wordlist = Wordlist::open(&path).unwrap();
        (path, wordlist)
    }

    fn spec(wordlist: Wordlist, target_hash: &str) -> JobSpec {
        JobSpec {
            target_hash: target_hash.to_string(),
            client_seed: "c1".to_string(),
            nonce: 0,
            wordlist,
            speed_limit: None,
            workers: 2,
        }
    }

    fn wait_terminal(job: &Job, timeout: Duration) -> ProgressSnapshot {
        let deadline = Instant::now() + timeout;
        loop {
            let snap = job.snapshot();
            if snap.status.is_terminal() {
                return snap;
            }
            assert!(Instant::now() < deadline, "job did not reach a terminal state");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_job_finds_known_seed() {
        let (_path, wordlist) = wordlist_of(&["alpha", "beta", "gamma"]);
        let target = hasher::derive_hash("beta", "c1", 0).unwrap();
        let job = Job::start(spec(wordlist, &target), EngineStats::new()).unwrap();

        let snap = wait_terminal(&job, Duration::from_secs(5));
        assert_eq!(snap.status, JobStatus::Found);
        assert_eq!(snap.total, Some(3));
        assert!((2..=3).contains(&snap.processed));

        let m = job.result().unwrap();
        assert_eq!(m.candidate, "beta");
        assert_eq!(m.index, 1);
        assert_eq!(
            m.roll,
            hasher::dice_roll("beta", "c1", 0).unwrap()
        );
    }

    #[test]
    fn test_job_exhausts_without_match() {
        let (_path, wordlist) = wordlist_of(&["alpha", "beta", "gamma"]);
        let target = hasher::derive_hash("absent", "c1", 0).unwrap();
        let job = Job::start(spec(wordlist, &target), EngineStats::new()).unwrap();

        let snap = wait_terminal(&job, Duration::from_secs(5));
        assert_eq!(snap.status, JobStatus::Exhausted);
        assert_eq!(snap.processed, 3);
        assert!(job.result().is_none());
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_empty_wordlist_is_terminal_error() {
        let (_path, wordlist) = wordlist_of(&["", "", ""]);
        let target = hasher::derive_hash("x", "c1", 0).unwrap();
        let job = Job::start(spec(wordlist, &target), EngineStats::new()).unwrap();

        let snap = wait_terminal(&job, Duration::from_secs(5));
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(snap.error.unwrap().kind, ErrorKind::Empty);
    }

    #[test]
    fn test_malformed_target_rejected_before_job_exists() {
        let (_path, wordlist) = wordlist_of(&["alpha"]);
        let result = Job::start(spec(wordlist, "not-a-hash"), EngineStats::new());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let (_path, wordlist) = wordlist_of(&["alpha"]);
        let target = hasher::derive_hash("x", "c1", 0).unwrap();
        let mut bad = spec(wordlist, &target);
        bad.workers = 0;
        assert!(matches!(
            Job::start(bad, EngineStats::new()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_negative_speed_limit_rejected() {
        let (_path, wordlist) = wordlist_of(&["alpha"]);
        let target = hasher::derive_hash("x", "c1", 0).unwrap();
        let mut bad = spec(wordlist, &target);
        bad.speed_limit = Some(-5.0);
        assert!(matches!(
            Job::start(bad, EngineStats::new()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_cancel_is_terminal_without_result() {
        let lines: Vec<String> = (0..1_000).map(|i| format!("word{}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (_path, wordlist) = wordlist_of(&refs);
        let target = hasher::derive_hash("absent", "c1", 0).unwrap();
        let mut slow = spec(wordlist, &target);
        slow.speed_limit = Some(100.0);
        let job = Job::start(slow, EngineStats::new()).unwrap();

        std::thread::sleep(Duration::from_millis(100));
        job.cancel();
        let snap = wait_terminal(&job, Duration::from_secs(5));
        assert_eq!(snap.status, JobStatus::Cancelled);
        assert!(job.result().is_none());
        // Repeated cancel on a terminal job stays a no-op
        assert_eq!(job.cancel(), JobStatus::Cancelled);
    }

    #[test]
    fn test_pause_resume_preserves_result_and_clock() {
        let lines: Vec<String> = (0..200).map(|i| format!("word{}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (_path, wordlist) = wordlist_of(&refs);
        let target = hasher::derive_hash("word150", "c1", 0).unwrap();
        let mut slow = spec(wordlist, &target);
        slow.speed_limit = Some(200.0);
        let wall_start = Instant::now();
        let job = Job::start(slow, EngineStats::new()).unwrap();

        // Let it get going, then pause
        let deadline = Instant::now() + Duration::from_secs(5);
        while job.snapshot().processed == 0 {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(job.pause(), JobStatus::Paused);
        // Idempotent: pausing again is a no-op
        assert_eq!(job.pause(), JobStatus::Paused);

        // In-flight candidates settle, then the count must hold still
        std::thread::sleep(Duration::from_millis(200));
        let frozen = job.snapshot().processed;
        std::thread::sleep(Duration::from_millis(800));
        assert_eq!(job.snapshot().processed, frozen);

        assert_eq!(job.resume(), JobStatus::Running);
        let snap = wait_terminal(&job, Duration::from_secs(20));
        let wall = wall_start.elapsed();

        assert_eq!(snap.status, JobStatus::Found);
        let m = job.result().unwrap();
        assert_eq!(m.candidate, "word150");
        assert_eq!(m.index, 150);

        // Elapsed excludes the ~1s pause
        assert!(
            snap.elapsed_seconds < wall.as_secs_f64() - 0.5,
            "elapsed {} should exclude paused time (wall {})",
            snap.elapsed_seconds,
            wall.as_secs_f64()
        );
    }

    #[test]
    fn test_resume_on_running_job_is_noop() {
        let lines: Vec<String> = (0..500).map(|i| format!("word{}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (_path, wordlist) = wordlist_of(&refs);
        let target = hasher::derive_hash("absent", "c1", 0).unwrap();
        let mut slow = spec(wordlist, &target);
        slow.speed_limit = Some(200.0);
        let job = Job::start(slow, EngineStats::new()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while job.status() == JobStatus::Pending {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(job.resume(), JobStatus::Running);
        job.cancel();
        wait_terminal(&job, Duration::from_secs(5));
    }

    #[test]
    fn test_snapshot_serializes_for_boundary_layer() {
        let (_path, wordlist) = wordlist_of(&["alpha"]);
        let target = hasher::derive_hash("alpha", "c1", 0).unwrap();
        let job = Job::start(spec(wordlist, &target), EngineStats::new()).unwrap();
        let snap = wait_terminal(&job, Duration::from_secs(5));

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["status"], "found");
        assert_eq!(json["total"], 1);
        assert!(json["error"].is_null());
    }

    #[test]
    fn test_invalid_archive_reaches_error_with_format_kind() {
        let file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
        let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
        let options = zip::write::SimpleFileOptions::default();
        for name in ["a.txt", "b.txt"] {
            writer.start_file(name, options).unwrap();
            std::io::Write::write_all(&mut writer, b"alpha\n").unwrap();
        }
        writer.finish().unwrap();
        let path = file.into_temp_path();

        let wordlist = Wordlist::open(&path).unwrap();
        let target = hasher::derive_hash("x", "c1", 0).unwrap();
        let job = Job::start(spec(wordlist, &target), EngineStats::new()).unwrap();

        let snap = wait_terminal(&job, Duration::from_secs(5));
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(snap.error.unwrap().kind, ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_speed_excludes_paused_duration() {
        let lines: Vec<String> = (0..100).map(|i| format!("word{}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (_path, wordlist) = wordlist_of(&refs);
        let target = hasher::derive_hash("absent", "c1", 0).unwrap();
        let mut slow = spec(wordlist, &target);
        slow.speed_limit = Some(100.0);
        let job = Job::start(slow, EngineStats::new()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while job.snapshot().processed < 10 {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(10));
        }
        job.pause();
        std::thread::sleep(Duration::from_millis(300));
        let before = job.snapshot();
        std::thread::sleep(Duration::from_millis(700));
        let after = job.snapshot();

        // Clock is frozen, so speed does not decay while paused
        assert_eq!(before.processed, after.processed);
        assert!((before.elapsed_seconds - after.elapsed_seconds).abs() < 0.05);

        job.cancel();
        wait_terminal(&job, Duration::from_secs(5));
    }
}
