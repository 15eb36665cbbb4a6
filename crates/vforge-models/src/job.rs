//! Job records and their status machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult, ValidationError};
use crate::{ProcessingOptions, Scene, SourceRef};

/// Store-assigned job identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for JobId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(JobId)
            .map_err(|_| ValidationError::invalid_source(format!("invalid job id '{}'", s)))
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet picked up by the orchestrator
    #[default]
    Pending,
    /// Stages are running
    Processing,
    /// Final artifact is ready
    Completed,
    /// A stage failed; see the error message
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (JobStatus::Pending, JobStatus::Pending) => true,
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Processing, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to create a job, validated once at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewJob {
    pub source: SourceRef,
    pub options: ProcessingOptions,
}

impl NewJob {
    pub fn new(source: SourceRef, options: ProcessingOptions) -> Self {
        Self { source, options }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()
    }
}

/// The unit of work tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,

    pub source: SourceRef,

    pub status: JobStatus,

    /// Progress (0-100)
    pub progress: u8,

    pub options: ProcessingOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<Scene>>,

    /// File name of the rendered output, set exactly when completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,

    /// Set exactly when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a pending job from a validated request.
    pub fn new(id: JobId, request: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id,
            source: request.source,
            status: JobStatus::Pending,
            progress: 0,
            options: request.options,
            transcript: None,
            scenes: None,
            artifact_ref: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Exactly one of: artifact set, error set, still running.
    pub fn outcome_is_consistent(&self) -> bool {
        match self.status {
            JobStatus::Completed => self.artifact_ref.is_some() && self.error_message.is_none(),
            JobStatus::Failed => self.error_message.is_some() && self.artifact_ref.is_none(),
            JobStatus::Pending | JobStatus::Processing => {
                self.artifact_ref.is_none() && self.error_message.is_none()
            }
        }
    }

    /// Merge a partial update into this record.
    ///
    /// The record is left untouched when the patch is rejected.
    pub fn apply_patch(&mut self, patch: &JobPatch) -> ModelResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        if self.is_terminal() {
            return Err(ModelError::TerminalJob {
                id: self.id,
                status: self.status,
            });
        }

        let next_status = patch.status.unwrap_or(self.status);
        if !self.status.can_transition_to(next_status) {
            return Err(ModelError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next_status,
            });
        }

        if let Some(requested) = patch.progress {
            let requested = requested.min(100);
            if requested < self.progress {
                return Err(ModelError::ProgressRegression {
                    id: self.id,
                    current: self.progress,
                    requested,
                });
            }
        }

        if patch.transcript.is_some() && self.transcript.is_some() {
            return Err(self.inconsistent("transcript is already set"));
        }
        if patch.scenes.is_some() && self.scenes.is_some() {
            return Err(self.inconsistent("scenes are already set"));
        }
        if patch.artifact_ref.is_some() && next_status != JobStatus::Completed {
            return Err(self.inconsistent("artifact reference requires completed status"));
        }
        if patch.error_message.is_some() && next_status != JobStatus::Failed {
            return Err(self.inconsistent("error message requires failed status"));
        }
        if next_status == JobStatus::Completed && patch.artifact_ref.is_none() {
            return Err(self.inconsistent("completed status requires an artifact reference"));
        }
        if next_status == JobStatus::Failed && patch.error_message.is_none() {
            return Err(self.inconsistent("failed status requires an error message"));
        }

        self.status = next_status;
        if let Some(progress) = patch.progress {
            self.progress = progress.min(100);
        }
        if let Some(transcript) = &patch.transcript {
            self.transcript = Some(transcript.clone());
        }
        if let Some(scenes) = &patch.scenes {
            self.scenes = Some(scenes.clone());
        }
        if let Some(artifact) = &patch.artifact_ref {
            self.artifact_ref = Some(artifact.clone());
        }
        if let Some(message) = &patch.error_message {
            self.error_message = Some(message.clone());
        }
        self.updated_at = Utc::now();

        Ok(())
    }

    fn inconsistent(&self, reason: &str) -> ModelError {
        ModelError::InconsistentPatch {
            id: self.id,
            reason: reason.to_string(),
        }
    }
}

/// Partial update merged into a stored job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<Scene>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move into processing at the given checkpoint.
    pub fn start(progress: u8) -> Self {
        Self::new().with_status(JobStatus::Processing).with_progress(progress)
    }

    /// Progress-only update.
    pub fn progress(progress: u8) -> Self {
        Self::new().with_progress(progress)
    }

    /// Terminal success.
    pub fn complete(artifact_ref: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            artifact_ref: Some(artifact_ref.into()),
            ..Self::default()
        }
    }

    /// Terminal failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn with_scenes(mut self, scenes: Vec<Scene>) -> Self {
        self.scenes = Some(scenes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.transcript.is_none()
            && self.scenes.is_none()
            && self.artifact_ref.is_none()
            && self.error_message.is_none()
    }
}
