//! Remote source acquisition.
//!
//! Remote pages are fetched with yt-dlp into the job's workspace. Deployments
//! that do not allow remote sources install `DisabledFetcher`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::command::{check_ytdlp, run_captured};
use crate::error::{MediaError, MediaResult};

/// Fetches a remote video to a local path.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Download `url` to `dest`, returning the written path.
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<PathBuf>;
}

/// yt-dlp backed fetcher.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher {
    timeout: Option<Duration>,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Arguments for one download; smallest mp4 rendition, single video only.
    pub fn build_args(url: &str, dest: &Path) -> Vec<String> {
        vec![
            "--format".to_string(),
            "worst[ext=mp4]/worst".to_string(),
            "--no-playlist".to_string(),
            "--output".to_string(),
            dest.to_string_lossy().to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl SourceFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<PathBuf> {
        check_ytdlp()?;

        info!(url = %url, dest = %dest.display(), "Downloading remote source");

        let output = run_captured("yt-dlp", &Self::build_args(url, dest), self.timeout).await?;

        if !output.success {
            let reason = output
                .stderr_tail
                .last()
                .cloned()
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(url = %url, exit_code = ?output.exit_code, "yt-dlp failed");
            return Err(MediaError::download_failed(format!("yt-dlp failed: {}", reason)));
        }

        if !tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Err(MediaError::download_failed("Output file not created"));
        }

        Ok(dest.to_path_buf())
    }
}

/// Fetcher used when remote sources are switched off.
#[derive(Debug, Clone)]
pub struct DisabledFetcher {
    reason: String,
}

impl DisabledFetcher {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DisabledFetcher {
    fn default() -> Self {
        Self::new("remote video sources are not enabled on this worker")
    }
}

#[async_trait]
impl SourceFetcher for DisabledFetcher {
    async fn fetch(&self, _url: &str, _dest: &Path) -> MediaResult<PathBuf> {
        Err(MediaError::RemoteDisabled(self.reason.clone()))
    }
}
