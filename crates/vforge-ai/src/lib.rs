//! Speech-to-text and transcript analysis for the vforge pipeline.
//!
//! The pipeline only sees the `Transcriber` and `ContentAnalyzer` traits.
//! `OpenAiClient` implements both against an OpenAI-compatible HTTP API.

pub mod client;
pub mod error;
pub mod parse;

use std::path::Path;

use async_trait::async_trait;
use vforge_models::ContentAnalysis;

pub use client::{AiClientConfig, OpenAiClient};
pub use error::{AiError, AiResult};
pub use parse::parse_analysis;

/// Text recognised from an audio file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Transcription {
    pub text: String,
}

/// Turns an audio file into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> AiResult<Transcription>;
}

/// Finds time-ranged scenes in a transcript.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(&self, transcript: &str) -> AiResult<ContentAnalysis>;
}
