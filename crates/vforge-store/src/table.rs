//! In-memory job table shared by both backends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vforge_models::{Job, JobId, JobPatch, NewJob};

use crate::error::StoreResult;

#[derive(Debug, Clone)]
pub(crate) struct JobTable {
    next_id: u64,
    jobs: BTreeMap<JobId, Job>,
}

/// On-disk form of a table.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    next_id: u64,
    jobs: Vec<Job>,
}

impl Default for JobTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            jobs: BTreeMap::new(),
        }
    }
}

impl JobTable {
    pub(crate) fn create(&mut self, request: NewJob) -> Job {
        let id = JobId::new(self.next_id);
        self.next_id += 1;
        let job = Job::new(id, request);
        self.jobs.insert(id, job.clone());
        job
    }

    pub(crate) fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.get(&id).cloned()
    }

    /// Apply the patch; the stored record is untouched when it is rejected.
    pub(crate) fn update(&mut self, id: JobId, patch: &JobPatch) -> StoreResult<Option<Job>> {
        let Some(job) = self.jobs.get_mut(&id) else {
            return Ok(None);
        };
        job.apply_patch(patch)?;
        Ok(Some(job.clone()))
    }

    /// Put back a previous version of a record.
    pub(crate) fn restore(&mut self, job: Job) {
        self.jobs.insert(job.id, job);
    }

    pub(crate) fn delete(&mut self, id: JobId) -> Option<Job> {
        self.jobs.remove(&id)
    }

    pub(crate) fn list(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id,
            jobs: self.list(),
        }
    }

    /// Rebuild from a snapshot, repairing a counter that lags its records.
    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        let jobs: BTreeMap<JobId, Job> = snapshot.jobs.into_iter().map(|j| (j.id, j)).collect();
        let max_id = jobs.keys().next_back().map(|id| id.0).unwrap_or(0);
        Self {
            next_id: snapshot.next_id.max(max_id + 1),
            jobs,
        }
    }
}
