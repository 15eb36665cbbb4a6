//! Process-local job store.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use vforge_models::{Job, JobId, JobPatch, NewJob};

use crate::error::StoreResult;
use crate::table::JobTable;
use crate::JobStore;

/// Map-backed store; records are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    table: RwLock<JobTable>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, request: NewJob) -> StoreResult<Job> {
        let job = self.table.write().await.create(request);
        debug!(job_id = %job.id, "Created job record");
        Ok(job)
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>> {
        Ok(self.table.read().await.get(id))
    }

    async fn update(&self, id: JobId, patch: &JobPatch) -> StoreResult<Option<Job>> {
        self.table.write().await.update(id, patch)
    }

    async fn delete(&self, id: JobId) -> StoreResult<bool> {
        Ok(self.table.write().await.delete(id).is_some())
    }

    async fn list_all(&self) -> StoreResult<Vec<Job>> {
        Ok(self.table.read().await.list())
    }
}
