//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent orchestrations
    pub max_concurrent_jobs: usize,
    /// Root of the job-scoped scratch directories
    pub work_dir: PathBuf,
    /// Where uploaded source files live
    pub upload_dir: PathBuf,
    /// Where finished artifacts are written
    pub output_dir: PathBuf,
    /// Limit for any single external invocation
    pub stage_timeout: Duration,
    /// Age after which an unfinished job is considered abandoned
    pub stale_threshold: Duration,
    /// How often the stale-job sweep runs
    pub sweep_interval: Duration,
    /// Allow fetching remote sources with yt-dlp
    pub remote_sources: bool,
    /// Persist jobs to this JSON file instead of memory
    pub job_store_path: Option<PathBuf>,
    /// Expose Prometheus metrics on this port
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            work_dir: PathBuf::from("/tmp/vforge/work"),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            stage_timeout: Duration::from_secs(1800),
            stale_threshold: Duration::from_secs(3600), // 1 hour
            sweep_interval: Duration::from_secs(300),
            remote_sources: false,
            job_store_path: None,
            metrics_port: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse::<usize>("WORKER_MAX_JOBS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            work_dir: env_parse("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            upload_dir: env_parse("WORKER_UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            output_dir: env_parse("WORKER_OUTPUT_DIR").unwrap_or(defaults.output_dir),
            stage_timeout: env_parse("WORKER_STAGE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stage_timeout),
            stale_threshold: env_parse("WORKER_STALE_THRESHOLD_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_threshold),
            sweep_interval: env_parse("WORKER_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            remote_sources: env_flag("WORKER_REMOTE_SOURCES").unwrap_or(defaults.remote_sources),
            job_store_path: env_parse("JOB_STORE_PATH"),
            metrics_port: env_parse("METRICS_PORT"),
        }
    }

    /// Point all three directories under one root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.work_dir = root.join("work");
        self.upload_dir = root.join("uploads");
        self.output_dir = root.join("outputs");
        self
    }

    pub fn with_max_concurrent_jobs(mut self, n: usize) -> Self {
        self.max_concurrent_jobs = n.max(1);
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Create the upload, output and work directories.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.work_dir, &self.upload_dir, &self.output_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}
