//! Model error types.

use thiserror::Error;

use crate::job::{JobId, JobStatus};

pub type ModelResult<T> = Result<T, ModelError>;

/// Rejected input, raised before a job exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid processing options: {0}")]
    InvalidOptions(String),
}

impl ValidationError {
    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}

/// Errors raised when a patch would break a job invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Job {id} is {status} and can no longer change")]
    TerminalJob { id: JobId, status: JobStatus },

    #[error("Invalid status transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Progress for job {id} cannot go backwards ({current} -> {requested})")]
    ProgressRegression {
        id: JobId,
        current: u8,
        requested: u8,
    },

    #[error("Inconsistent patch for job {id}: {reason}")]
    InconsistentPatch { id: JobId, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
