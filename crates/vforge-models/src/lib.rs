//! Shared data models for the vforge video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their status machine and merge patches
//! - Source references (uploaded file or remote URL)
//! - Encoding configuration for the final render
//! - Processing options and the output resolution table
//! - Scene descriptors returned by content analysis

pub mod encoding;
pub mod error;
pub mod job;
pub mod options;
pub mod scene;
pub mod source;

// Re-export common types
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult, ValidationError};
pub use job::{Job, JobId, JobPatch, JobStatus, NewJob};
pub use options::{AspectRatio, ProcessingOptions, Quality, Resolution};
pub use scene::{ContentAnalysis, Scene};
pub use source::{RemoteSource, SourceRef, UploadedFile};
