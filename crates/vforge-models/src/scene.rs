//! Scene descriptors produced by content analysis.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A time-ranged region of the source flagged as engaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Analyzer confidence in [0, 1]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Scene {
    pub fn new(start_time: f64, end_time: f64, confidence: f64) -> Self {
        Self {
            start_time,
            end_time,
            confidence,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Check the descriptor is well-formed.
    pub fn check(&self) -> Result<(), String> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err("scene times must be finite numbers".to_string());
        }
        if self.start_time < 0.0 {
            return Err(format!("scene start {} is negative", self.start_time));
        }
        if self.end_time < self.start_time {
            return Err(format!(
                "scene ends ({}) before it starts ({})",
                self.end_time, self.start_time
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("scene confidence {} is outside [0, 1]", self.confidence));
        }
        Ok(())
    }
}

/// Structured result of analyzing a transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContentAnalysis {
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub highlights: Vec<String>,
}
