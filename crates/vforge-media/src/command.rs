//! FFmpeg command builder and subprocess runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Lines of stderr kept for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Drop the video stream.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-acodec").output_arg(codec)
    }

    /// Set audio sample rate.
    pub fn audio_rate(self, hz: u32) -> Self {
        self.output_arg("-ar").output_arg(hz.to_string())
    }

    /// Set number of audio channels.
    pub fn audio_channels(self, channels: u8) -> Self {
        self.output_arg("-ac").output_arg(channels.to_string())
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Never wait on stdin
        args.push("-nostdin".to_string());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Exit information and captured output of a finished subprocess.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<String>,
    /// Last lines written to stderr
    pub stderr_tail: Vec<String>,
}

impl CapturedOutput {
    pub fn stderr_text(&self) -> Option<String> {
        if self.stderr_tail.is_empty() {
            None
        } else {
            Some(self.stderr_tail.join("\n"))
        }
    }
}

/// Run a tool to completion, capturing stdout and the tail of stderr.
///
/// The child is killed when `timeout` elapses.
pub async fn run_captured(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> MediaResult<CapturedOutput> {
    debug!("Running: {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MediaError::spawn_failed(program, e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::internal("stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MediaError::internal("stderr not captured"))?;

    let stdout_handle = tokio::spawn(collect_lines(stdout, usize::MAX));
    let stderr_handle = tokio::spawn(collect_lines(stderr, STDERR_TAIL_LINES));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("{} timed out after {:?}, killing process", program, limit);
                let _ = child.kill().await;
                return Err(MediaError::Timeout(limit.as_secs()));
            }
        },
        None => child.wait().await?,
    };

    let stdout = stdout_handle.await.unwrap_or_default();
    let stderr_tail = stderr_handle.await.unwrap_or_default();

    Ok(CapturedOutput {
        exit_code: status.code(),
        success: status.success(),
        stdout,
        stderr_tail,
    })
}

/// Read non-empty lines, keeping at most `keep` of the most recent ones.
///
/// Reads to EOF even past invalid UTF-8 or read errors, so the child never
/// writes into a closed pipe.
async fn collect_lines<R>(reader: R, keep: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut kept = VecDeque::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Stopped reading process output: {}", e);
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf).trim().to_string();
        if line.is_empty() {
            continue;
        }
        if kept.len() == keep {
            kept.pop_front();
        }
        kept.push_back(line);
    }

    kept.into_iter().collect()
}

/// Runner for FFmpeg commands with an optional timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout per invocation
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run an FFmpeg command, failing on a non-zero exit.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let output = run_captured("ffmpeg", &cmd.build_args(), self.timeout).await?;

        if output.success {
            return Ok(());
        }

        let stderr = output.stderr_text();
        let code = output
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let message = match &stderr {
            Some(text) => format!("FFmpeg exited with code {}: {}", code, text),
            None => format!("FFmpeg exited with code {}", code),
        };

        Err(MediaError::ffmpeg_failed(message, stderr, output.exit_code))
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if yt-dlp is available.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)
}
