//! Job store persisted as a JSON snapshot.
//!
//! Every successful write rewrites the whole snapshot through a temp file and
//! a rename, so the file on disk is always a complete table.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use vforge_models::{Job, JobId, JobPatch, NewJob};

use crate::error::StoreResult;
use crate::table::{JobTable, Snapshot};
use crate::JobStore;

#[derive(Debug)]
pub struct FileJobStore {
    path: PathBuf,
    table: RwLock<JobTable>,
}

impl FileJobStore {
    /// Open the snapshot at `path`, starting empty if it does not exist.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                let table = JobTable::from_snapshot(snapshot);
                info!(path = %path.display(), jobs = table.len(), "Loaded job snapshot");
                table
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                debug!(path = %path.display(), "No job snapshot yet, starting empty");
                JobTable::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            table: RwLock::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, table: &JobTable) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&table.snapshot())?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn create(&self, request: NewJob) -> StoreResult<Job> {
        let mut table = self.table.write().await;
        let job = table.create(request);
        if let Err(e) = self.persist(&table).await {
            table.delete(job.id);
            return Err(e);
        }
        Ok(job)
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>> {
        Ok(self.table.read().await.get(id))
    }

    async fn update(&self, id: JobId, patch: &JobPatch) -> StoreResult<Option<Job>> {
        let mut table = self.table.write().await;
        let Some(previous) = table.get(id) else {
            return Ok(None);
        };
        let updated = table.update(id, patch)?;
        if let Err(e) = self.persist(&table).await {
            warn!(job_id = %id, error = %e, "Snapshot write failed, reverting update");
            table.restore(previous);
            return Err(e);
        }
        Ok(updated)
    }

    async fn delete(&self, id: JobId) -> StoreResult<bool> {
        let mut table = self.table.write().await;
        let Some(removed) = table.delete(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&table).await {
            table.restore(removed);
            return Err(e);
        }
        Ok(true)
    }

    async fn list_all(&self) -> StoreResult<Vec<Job>> {
        Ok(self.table.read().await.list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vforge_models::{JobStatus, ProcessingOptions, SourceRef};

    fn new_job() -> NewJob {
        NewJob::new(SourceRef::upload("clip", None), ProcessingOptions::default())
    }

    #[tokio::test]
    async fn test_reopen_restores_records_and_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("jobs.json");

        let store = FileJobStore::open(&path).await.unwrap();
        let a = store.create(new_job()).await.unwrap();
        store.create(new_job()).await.unwrap();
        store.update(a.id, &JobPatch::start(10)).await.unwrap();
        store.delete(JobId::new(2)).await.unwrap();
        drop(store);

        let reopened = FileJobStore::open(&path).await.unwrap();
        let jobs = reopened.list_all().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Processing);
        assert_eq!(jobs[0].progress, 10);

        // Deleted ids are not reused
        let c = reopened.create(new_job()).await.unwrap();
        assert_eq!(c.id, JobId::new(3));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        assert!(FileJobStore::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_update_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let store = FileJobStore::open(&path).await.unwrap();
        let job = store.create(new_job()).await.unwrap();

        store.update(job.id, &JobPatch::start(50)).await.unwrap();
        assert!(store.update(job.id, &JobPatch::progress(20)).await.is_err());

        let reopened = FileJobStore::open(&path).await.unwrap();
        assert_eq!(reopened.get(job.id).await.unwrap().unwrap().progress, 50);
    }
}
