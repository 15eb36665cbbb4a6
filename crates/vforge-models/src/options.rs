//! Processing options and output geometry.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Output aspect ratio requested for the final render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    /// Portrait for TikTok/Reels/Shorts
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    /// Landscape, kept at the source resolution
    #[serde(rename = "16:9")]
    Landscape,
    /// Square
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "9:16" => Ok(AspectRatio::Portrait),
            "16:9" => Ok(AspectRatio::Landscape),
            "1:1" => Ok(AspectRatio::Square),
            other => Err(ValidationError::invalid_options(format!(
                "unsupported output aspect '{}', expected one of 9:16, 16:9, 1:1",
                other
            ))),
        }
    }
}

/// Output quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "high" => Ok(Quality::High),
            "medium" => Ok(Quality::Medium),
            "low" => Ok(Quality::Low),
            other => Err(ValidationError::invalid_options(format!(
                "unsupported quality '{}', expected one of high, medium, low",
                other
            ))),
        }
    }
}

/// Target frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Resolve the target box for an aspect/quality pair.
    ///
    /// Returns `None` for 16:9, which keeps the source resolution.
    pub fn resolve(aspect: AspectRatio, quality: Quality) -> Option<Resolution> {
        match (aspect, quality) {
            (AspectRatio::Portrait, Quality::High) => Some(Resolution::new(1080, 1920)),
            (AspectRatio::Portrait, Quality::Medium) => Some(Resolution::new(720, 1280)),
            (AspectRatio::Portrait, Quality::Low) => Some(Resolution::new(480, 854)),
            (AspectRatio::Square, Quality::High) => Some(Resolution::new(1080, 1080)),
            (AspectRatio::Square, Quality::Medium) => Some(Resolution::new(720, 720)),
            (AspectRatio::Square, Quality::Low) => Some(Resolution::new(480, 480)),
            (AspectRatio::Landscape, _) => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Immutable per-job configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOptions {
    /// Run the transcription stage and burn subtitles into the render
    #[serde(alias = "autoTranscription")]
    pub transcribe: bool,

    /// Run content analysis on the transcript (requires `transcribe`)
    #[serde(alias = "sceneDetection")]
    pub detect_scenes: bool,

    /// Carried through for clients; the pipeline does not mix music yet
    #[serde(default)]
    pub background_music: bool,

    #[serde(alias = "outputFormat")]
    pub output_aspect: AspectRatio,

    pub quality: Quality,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            transcribe: true,
            detect_scenes: true,
            background_music: false,
            output_aspect: AspectRatio::Portrait,
            quality: Quality::High,
        }
    }
}

impl ProcessingOptions {
    /// Scene detection only runs on top of a transcript.
    pub fn runs_scene_detection(&self) -> bool {
        self.transcribe && self.detect_scenes
    }

    /// Target box for the final render, `None` when the source size is kept.
    pub fn target_resolution(&self) -> Option<Resolution> {
        Resolution::resolve(self.output_aspect, self.quality)
    }

    /// Parse options from the JSON shape clients send.
    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(raw).map_err(|e| ValidationError::invalid_options(e.to_string()))
    }
}
