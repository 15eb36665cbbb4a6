//! The transcode capability.
//!
//! Pipeline stages describe what they want as a `TranscodeSpec`; only
//! `TranscodeRequest::to_command` knows how that becomes ffmpeg arguments.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use vforge_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::FilterChain;

/// Mono PCM waveform for speech-to-text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpec {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u8,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            codec: "pcm_s16le".to_string(),
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Final video render: geometry and captions plus encoder settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSpec {
    pub filters: FilterChain,
    pub encoding: EncodingConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeSpec {
    ExtractAudio(AudioSpec),
    Render(RenderSpec),
}

impl TranscodeSpec {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TranscodeSpec::ExtractAudio(_) => "extract_audio",
            TranscodeSpec::Render(_) => "render",
        }
    }
}

/// One transcode invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub spec: TranscodeSpec,
}

impl TranscodeRequest {
    pub fn extract_audio(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            spec: TranscodeSpec::ExtractAudio(AudioSpec::default()),
        }
    }

    pub fn render(input: impl AsRef<Path>, output: impl AsRef<Path>, spec: RenderSpec) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            spec: TranscodeSpec::Render(spec),
        }
    }

    pub fn to_command(&self) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(&self.input, &self.output);
        match &self.spec {
            TranscodeSpec::ExtractAudio(audio) => cmd
                .no_video()
                .audio_codec(audio.codec.clone())
                .audio_rate(audio.sample_rate)
                .audio_channels(audio.channels),
            TranscodeSpec::Render(render) => {
                let cmd = match render.filters.to_filter_string() {
                    Some(vf) => cmd.video_filter(vf),
                    None => cmd,
                };
                cmd.output_args(render.encoding.to_ffmpeg_args())
            }
        }
    }
}

/// Produces an output media file from an input and a spec.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, request: &TranscodeRequest) -> MediaResult<PathBuf>;
}

/// Transcoder that shells out to ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> MediaResult<PathBuf> {
        if !tokio::fs::try_exists(&request.input).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(request.input.clone()));
        }

        debug!(
            kind = request.spec.kind(),
            input = %request.input.display(),
            output = %request.output.display(),
            "Starting transcode"
        );

        self.runner.run(&request.to_command()).await?;

        if !tokio::fs::try_exists(&request.output).await.unwrap_or(false) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg reported success but produced no output",
                None,
                Some(0),
            ));
        }

        info!(
            kind = request.spec.kind(),
            output = %request.output.display(),
            "Transcode finished"
        );
        Ok(request.output.clone())
    }
}
