//! Structured job logging.

use tracing::{error, info, warn, Span};
use vforge_models::JobId;

use crate::error::Stage;

/// Logs job lifecycle events with the job id and operation attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: JobId, operation: &str) -> Self {
        Self {
            job_id,
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log a stage reaching its checkpoint.
    pub fn log_stage(&self, stage: Stage, progress: u8) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = %stage,
            progress,
            "Job progress: {} done", stage
        );
    }

    pub fn log_skip(&self, stage: Stage, reason: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = %stage,
            "Job progress: {} skipped ({})", stage, reason
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span for instrumenting the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let logger = JobLogger::new(JobId::new(7), "video_pipeline");
        assert_eq!(logger.job_id(), JobId::new(7));
        assert_eq!(logger.operation(), "video_pipeline");
    }
}
