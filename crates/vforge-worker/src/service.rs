//! Boundary facade over the store and scheduler.
//!
//! Inputs are validated here, once; nothing invalid reaches the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use vforge_models::{Job, JobId, JobPatch, NewJob, ProcessingOptions, SourceRef};
use vforge_store::JobStore;

use crate::config::WorkerConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::scheduler::Scheduler;

pub const REMOTE_DISABLED_MESSAGE: &str =
    "Remote video sources are not enabled on this worker. Please upload video files directly.";

pub struct JobService {
    store: Arc<dyn JobStore>,
    scheduler: Scheduler,
    config: WorkerConfig,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, scheduler: Scheduler, config: WorkerConfig) -> Self {
        Self {
            store,
            scheduler,
            config,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Create a job for a file already in the upload area and schedule it.
    pub async fn submit_upload(
        &self,
        filename: impl Into<String>,
        original_name: Option<String>,
        options: ProcessingOptions,
    ) -> ServiceResult<Job> {
        let request = NewJob::new(SourceRef::upload(filename, original_name), options);
        request.validate()?;

        let job = self.store.create(request).await?;
        info!(job_id = %job.id, source = job.source.display_name(), "Upload job created");
        self.scheduler.submit(job.id);
        Ok(job)
    }

    /// Create a job for a remote video page.
    ///
    /// When remote sources are disabled the job is still recorded, as failed,
    /// and the call returns `Unimplemented` carrying its id.
    pub async fn submit_remote(
        &self,
        url: impl Into<String>,
        options: ProcessingOptions,
    ) -> ServiceResult<Job> {
        let request = NewJob::new(SourceRef::remote(url), options);
        request.validate()?;

        let job = self.store.create(request).await?;

        if !self.config.remote_sources {
            warn!(job_id = %job.id, "Remote source rejected, remote sources are disabled");
            self.store
                .update(job.id, &JobPatch::fail(REMOTE_DISABLED_MESSAGE))
                .await?;
            return Err(ServiceError::Unimplemented {
                job_id: Some(job.id),
                message: REMOTE_DISABLED_MESSAGE.to_string(),
            });
        }

        info!(job_id = %job.id, url = job.source.display_name(), "Remote job created");
        self.scheduler.submit(job.id);
        Ok(job)
    }

    pub async fn get(&self, id: JobId) -> ServiceResult<Job> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Job {} not found", id)))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Job>> {
        Ok(self.store.list_all().await?)
    }

    /// Remove the record and, best-effort, its artifact.
    pub async fn delete(&self, id: JobId) -> ServiceResult<()> {
        let job = self.get(id).await?;

        if !self.store.delete(id).await? {
            return Err(ServiceError::not_found(format!("Job {} not found", id)));
        }

        if let Some(artifact) = &job.artifact_ref {
            let path = self.config.output_dir.join(artifact);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(job_id = %id, path = %path.display(), error = %e, "Failed to remove artifact");
                }
            }
        }

        info!(job_id = %id, "Job deleted");
        Ok(())
    }

    /// Location of a completed job's output file.
    pub async fn artifact_path(&self, id: JobId) -> ServiceResult<PathBuf> {
        let job = self.get(id).await?;
        let artifact = job
            .artifact_ref
            .ok_or_else(|| ServiceError::not_found(format!("Job {} has no processed video", id)))?;

        let path = self.config.output_dir.join(artifact);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(path),
            Ok(false) => Err(ServiceError::not_found(format!(
                "Processed video for job {} is missing",
                id
            ))),
            Err(e) => Err(ServiceError::internal(format!(
                "Could not check processed video for job {}: {}",
                id, e
            ))),
        }
    }
}
