use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque, time-ordered batch identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for JobId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| RegistryError::InvalidId(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job not found or already finished: {0}")]
    NotFound(JobId),

    #[error("Invalid job id: {0}")]
    InvalidId(String),
}

/// Public view of a live job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub id: JobId,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct JobHandle {
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

/// Process-wide table of live batch jobs.
///
/// An entry leaves the table exactly once, either through
/// [`request_stop`](Self::request_stop) or [`complete`](Self::complete),
/// whichever comes first.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobHandle>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a new job and returns its id with the token workers watch.
    pub fn register(&self) -> (JobId, CancellationToken) {
        let id = JobId::new();
        let cancel = CancellationToken::new();
        self.lock().insert(
            id,
            JobHandle {
                cancel: cancel.clone(),
                started_at: Utc::now(),
            },
        );
        debug!(job_id = %id, "Job registered");
        (id, cancel)
    }

    /// Signals cancellation and removes the job.
    pub fn request_stop(&self, id: JobId) -> Result<(), RegistryError> {
        let handle = self.lock().remove(&id).ok_or(RegistryError::NotFound(id))?;
        handle.cancel.cancel();
        info!(job_id = %id, "Stop requested");
        Ok(())
    }

    /// Removes a job that ran to the end. Returns `false` when it was
    /// already removed by a stop request.
    pub fn complete(&self, id: JobId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(job_id = %id, "Job completed");
        }
        removed
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Live jobs, oldest first.
    pub fn list(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self
            .lock()
            .iter()
            .map(|(id, handle)| JobInfo {
                id: *id,
                started_at: handle.started_at,
            })
            .collect();
        jobs.sort_by_key(|j| (j.started_at, j.id.0));
        jobs
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
