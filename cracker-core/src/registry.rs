//! Process-wide registry of cracking jobs
//!
//! An explicit registry with a defined lifecycle: created at process start,
//! jobs inserted on submission, removed on explicit cleanup. Control and poll
//! calls go through the registry by job id so the boundary layer never holds
//! a job directly.

use crate::job::{Job, JobSpec, JobStatus, ProgressSnapshot};
use crate::pool::Match;
use crate::stats::EngineStats;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Registry of all live jobs in the process
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, Arc<Job>>>,
    stats: EngineStats,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            stats: EngineStats::new(),
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Validate and start a job, returning its id
    pub fn submit(&self, spec: JobSpec) -> Result<Uuid> {
        let job = Job::start(spec, self.stats.clone())?;
        let id = job.id();
        self.jobs.write().insert(id, job);
        info!(job = %id, "Job submitted");
        Ok(id)
    }

    fn get(&self, id: Uuid) -> Result<Arc<Job>> {
        self.jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    /// Idempotent: pausing a non-running job returns its current status
    pub fn pause(&self, id: Uuid) -> Result<JobStatus> {
        Ok(self.get(id)?.pause())
    }

    /// Idempotent: resuming a non-paused job returns its current status
    pub fn resume(&self, id: Uuid) -> Result<JobStatus> {
        Ok(self.get(id)?.resume())
    }

    pub fn cancel(&self, id: Uuid) -> Result<JobStatus> {
        Ok(self.get(id)?.cancel())
    }

    /// Safe to call at any rate; bounded by a short read lock
    pub fn snapshot(&self, id: Uuid) -> Result<ProgressSnapshot> {
        Ok(self.get(id)?.snapshot())
    }

    /// The match, if any, once the job is terminal
    pub fn result(&self, id: Uuid) -> Result<Option<Match>> {
        Ok(self.get(id)?.result())
    }

    /// Explicit cleanup: cancels the job if still live, then drops it
    pub fn remove(&self, id: Uuid) -> Result<()> {
        let job = self
            .jobs
            .write()
            .remove(&id)
            .ok_or(Error::NotFound(id))?;
        job.cancel();
        info!(job = %id, "Job removed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}
