//! FFmpeg and yt-dlp wrappers for the vforge pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a timeout-aware runner
//! - A structured filter-chain builder (scale, pad, subtitle burn-in)
//! - The `Transcoder` capability and its FFmpeg implementation
//! - Subtitle cue formatting and SRT output
//! - Remote source acquisition via yt-dlp

pub mod command;
pub mod download;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod subtitles;
pub mod transcode;

pub use command::{check_ffmpeg, check_ytdlp, run_captured, CapturedOutput, FfmpegCommand, FfmpegRunner};
pub use download::{DisabledFetcher, SourceFetcher, YtDlpFetcher};
pub use error::{MediaError, MediaResult};
pub use filters::{FilterChain, FilterStage, SubtitleStyle};
pub use fs_utils::move_file;
pub use subtitles::{format_cues, format_srt_timestamp, to_srt, write_srt, Cue};
pub use transcode::{
    AudioSpec, FfmpegTranscoder, RenderSpec, TranscodeRequest, TranscodeSpec, Transcoder,
};
