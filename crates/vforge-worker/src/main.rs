//! vforge worker binary.
//!
//! Each argument is a local video file (copied into the upload area) or an
//! http(s) URL. All jobs are submitted with the options from
//! `PROCESSING_OPTIONS`, run to completion, and printed as JSON.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use vforge_ai::OpenAiClient;
use vforge_media::{DisabledFetcher, FfmpegRunner, FfmpegTranscoder, SourceFetcher, YtDlpFetcher};
use vforge_models::{JobStatus, ProcessingOptions};
use vforge_store::{FileJobStore, JobStore, MemoryJobStore};
use vforge_worker::{
    metrics, Capabilities, JobService, Orchestrator, Scheduler, ServiceError, StaleJobSweeper,
    WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();

    init_tracing();

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Worker error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vforge_worker=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Returns whether every job completed.
async fn run() -> anyhow::Result<bool> {
    let inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        eprintln!("usage: vforge-worker <video-file-or-url>...");
        return Ok(false);
    }

    info!("Starting vforge-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);
    config
        .ensure_dirs()
        .await
        .context("failed to create worker directories")?;

    let ffmpeg = vforge_media::check_ffmpeg().context("ffmpeg is required")?;
    info!("Using ffmpeg at {}", ffmpeg.display());
    if config.remote_sources {
        let ytdlp = vforge_media::check_ytdlp().context("yt-dlp is required for remote sources")?;
        info!("Using yt-dlp at {}", ytdlp.display());
    }

    if let Some(port) = config.metrics_port {
        metrics::install_prometheus(port).context("failed to start metrics exporter")?;
        info!("Prometheus metrics on port {}", port);
    }

    let options = match std::env::var("PROCESSING_OPTIONS") {
        Ok(raw) => ProcessingOptions::from_json(&raw).context("invalid PROCESSING_OPTIONS")?,
        Err(_) => ProcessingOptions::default(),
    };

    let store: Arc<dyn JobStore> = match &config.job_store_path {
        Some(path) => Arc::new(
            FileJobStore::open(path)
                .await
                .with_context(|| format!("failed to open job store {}", path.display()))?,
        ),
        None => Arc::new(MemoryJobStore::new()),
    };

    let ai = Arc::new(OpenAiClient::from_env().context("failed to create AI client")?);
    let fetcher: Arc<dyn SourceFetcher> = if config.remote_sources {
        Arc::new(YtDlpFetcher::new().with_timeout(config.stage_timeout))
    } else {
        Arc::new(DisabledFetcher::default())
    };
    let caps = Capabilities {
        transcoder: Arc::new(FfmpegTranscoder::new(
            FfmpegRunner::new().with_timeout(config.stage_timeout),
        )),
        transcriber: ai.clone(),
        analyzer: ai,
        fetcher,
    };

    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), caps, config.clone()));
    let scheduler = Scheduler::new(orchestrator, config.max_concurrent_jobs);

    let sweeper = StaleJobSweeper::new(
        Arc::clone(&store),
        scheduler.clone(),
        config.stale_threshold,
        config.sweep_interval,
    );
    sweeper
        .reconcile_startup()
        .await
        .context("startup reconciliation failed")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    let service = JobService::new(Arc::clone(&store), scheduler.clone(), config.clone());

    let mut job_ids = Vec::new();
    let mut all_ok = true;
    for input in &inputs {
        let submitted = if input.starts_with("http://") || input.starts_with("https://") {
            service.submit_remote(input.clone(), options).await
        } else {
            match stage_upload(Path::new(input), &config).await {
                Ok((stored, original)) => service.submit_upload(stored, Some(original), options).await,
                Err(e) => {
                    error!("Could not stage {}: {:#}", input, e);
                    all_ok = false;
                    continue;
                }
            }
        };

        match submitted {
            Ok(job) => job_ids.push(job.id),
            Err(ServiceError::Unimplemented { job_id, message }) => {
                warn!("{}: {}", input, message);
                job_ids.extend(job_id);
                all_ok = false;
            }
            Err(e) => {
                error!("Could not submit {}: {} (status {})", input, e, e.status_code());
                all_ok = false;
            }
        }
    }

    tokio::select! {
        _ = scheduler.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Received shutdown signal, not waiting for running jobs");
            scheduler.close();
        }
    }

    let _ = shutdown_tx.send(true);
    sweeper_task.await.ok();

    let mut jobs = Vec::with_capacity(job_ids.len());
    for id in job_ids {
        let job = service.get(id).await?;
        if job.status != JobStatus::Completed {
            all_ok = false;
        }
        jobs.push(job);
    }
    println!("{}", serde_json::to_string_pretty(&jobs)?);

    info!("Worker shutdown complete");
    Ok(all_ok)
}

/// Copy a local file into the upload area under a unique stored name.
async fn stage_upload(path: &Path, config: &WorkerConfig) -> anyhow::Result<(String, String)> {
    let original = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("input has no file name")?;
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stored = format!("{}{}", Uuid::new_v4().simple(), extension);

    tokio::fs::copy(path, config.upload_dir.join(&stored))
        .await
        .with_context(|| format!("failed to copy {} into the upload area", path.display()))?;

    Ok((stored, original))
}
