//! Worker error types.
//!
//! `PipelineError` is what a stage failure becomes; its `Display` is stored
//! verbatim as the job's error message. `ServiceError` is the boundary error
//! returned to callers of `JobService`.

use std::fmt;

use thiserror::Error;
use vforge_ai::AiError;
use vforge_media::MediaError;
use vforge_models::{JobId, ValidationError};
use vforge_store::StoreError;

pub type PipelineResult<T> = Result<T, PipelineError>;
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Ordered units of pipeline work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Acquire,
    ExtractAudio,
    Transcribe,
    DetectScenes,
    Subtitles,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::ExtractAudio => "extract_audio",
            Stage::Transcribe => "transcribe",
            Stage::DetectScenes => "detect_scenes",
            Stage::Subtitles => "subtitles",
            Stage::Render => "render",
        }
    }

    /// Progress written once the stage succeeds.
    pub fn checkpoint(&self) -> u8 {
        match self {
            Stage::Acquire => 20,
            Stage::ExtractAudio => 30,
            Stage::Transcribe => 60,
            Stage::DetectScenes => 80,
            Stage::Subtitles => 90,
            Stage::Render => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("acquire stage failed: {message}")]
    Acquisition { message: String },

    #[error("{stage} stage failed: {source}")]
    Transcode {
        stage: Stage,
        #[source]
        source: MediaError,
    },

    #[error("transcribe stage failed: {0}")]
    Transcription(#[source] AiError),

    #[error("detect_scenes stage failed: {0}")]
    Analysis(#[source] AiError),

    #[error("{stage} stage failed: job store error: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("{stage} stage failed: job {id} no longer exists")]
    JobMissing { stage: Stage, id: JobId },

    #[error("{stage} stage failed: timed out after {secs} seconds")]
    Timeout { stage: Stage, secs: u64 },

    #[error("{stage} stage failed: {message}")]
    Workspace { stage: Stage, message: String },
}

impl PipelineError {
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::Acquisition {
            message: message.into(),
        }
    }

    pub fn transcode(stage: Stage, source: MediaError) -> Self {
        Self::Transcode { stage, source }
    }

    pub fn store(stage: Stage, source: StoreError) -> Self {
        Self::Store { stage, source }
    }

    pub fn workspace(stage: Stage, err: impl fmt::Display) -> Self {
        Self::Workspace {
            stage,
            message: err.to_string(),
        }
    }

    /// The stage the failure is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Acquisition { .. } => Stage::Acquire,
            PipelineError::Transcription(_) => Stage::Transcribe,
            PipelineError::Analysis(_) => Stage::DetectScenes,
            PipelineError::Transcode { stage, .. }
            | PipelineError::Store { stage, .. }
            | PipelineError::JobMissing { stage, .. }
            | PipelineError::Timeout { stage, .. }
            | PipelineError::Workspace { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not implemented: {message}")]
    Unimplemented {
        /// Job recorded as failed for the rejected request
        job_id: Option<JobId>,
        message: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status an outer surface should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Unimplemented { .. } => 501,
            ServiceError::Store(_) | ServiceError::Internal(_) => 500,
        }
    }
}
