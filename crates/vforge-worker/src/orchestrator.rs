//! Drives one job through the stage sequence.
//!
//! Stages run strictly in order: acquire, extract audio, transcribe,
//! detect scenes, subtitles, render. Each success writes its checkpoint to
//! the store; the first failure is written as a terminal `failed` record and
//! nothing is re-thrown.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, warn, Instrument};
use vforge_ai::{ContentAnalyzer, Transcriber};
use vforge_media::{
    move_file, write_srt, FilterChain, RenderSpec, SourceFetcher, SubtitleStyle, TranscodeRequest,
    Transcoder,
};
use vforge_models::{EncodingConfig, Job, JobId, JobPatch, SourceRef};
use vforge_store::JobStore;

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::logging::JobLogger;
use crate::metrics;
use crate::workspace::JobWorkspace;

/// Progress written when an upload-sourced job starts.
const UPLOAD_START_PROGRESS: u8 = 10;
/// Progress written when a remote-sourced job starts, before the fetch.
const REMOTE_START_PROGRESS: u8 = 5;

/// External capabilities the pipeline delegates to.
#[derive(Clone)]
pub struct Capabilities {
    pub transcoder: Arc<dyn Transcoder>,
    pub transcriber: Arc<dyn Transcriber>,
    pub analyzer: Arc<dyn ContentAnalyzer>,
    pub fetcher: Arc<dyn SourceFetcher>,
}

/// Artifact file name for a job finished at the current instant.
pub fn artifact_file_name(id: JobId) -> String {
    format!("processed_{}_{}.mp4", id, Utc::now().timestamp_millis())
}

pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    caps: Capabilities,
    config: WorkerConfig,
    encoding: EncodingConfig,
    subtitle_style: SubtitleStyle,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn JobStore>, caps: Capabilities, config: WorkerConfig) -> Self {
        Self {
            store,
            caps,
            config,
            encoding: EncodingConfig::default(),
            subtitle_style: SubtitleStyle::default(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Run the pipeline for `id` to a terminal state.
    ///
    /// Never fails outward; an unknown or already finished job is a no-op.
    pub async fn run(&self, id: JobId) {
        let logger = JobLogger::new(id, "video_pipeline");
        let span = logger.create_span();
        self.run_logged(id, &logger).instrument(span).await
    }

    async fn run_logged(&self, id: JobId, logger: &JobLogger) {
        let job = match self.store.get(id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                logger.log_warning("job not found, nothing to run");
                return;
            }
            Err(e) => {
                logger.log_error(&format!("could not load job: {}", e));
                return;
            }
        };

        if job.is_terminal() {
            logger.log_warning(&format!("job is already {}, skipping", job.status.as_str()));
            return;
        }

        logger.log_start(job.source.display_name());

        let workspace = match JobWorkspace::create(&self.config.work_dir, id).await {
            Ok(ws) => ws,
            Err(e) => {
                self.fail(id, &PipelineError::workspace(Stage::Acquire, e), logger)
                    .await;
                return;
            }
        };

        match self.execute(&job, &workspace, logger).await {
            Ok(artifact) => {
                metrics::record_job_completed();
                logger.log_completion(&artifact);
            }
            Err(e) => self.fail(id, &e, logger).await,
        }

        workspace.cleanup().await;
    }

    async fn execute(
        &self,
        job: &Job,
        ws: &JobWorkspace,
        logger: &JobLogger,
    ) -> PipelineResult<String> {
        let id = job.id;
        let options = &job.options;

        let input = self.acquire(job, ws, logger).await?;

        let audio = ws.audio_path();
        let request = TranscodeRequest::extract_audio(&input, &audio);
        self.timed(Stage::ExtractAudio, self.caps.transcoder.transcode(&request))
            .await?
            .map_err(|e| PipelineError::transcode(Stage::ExtractAudio, e))?;
        self.checkpoint(id, Stage::ExtractAudio, JobPatch::progress(30), logger)
            .await?;

        let mut transcript = None;
        if options.transcribe {
            let text = self
                .timed(Stage::Transcribe, self.caps.transcriber.transcribe(&audio))
                .await?
                .map_err(PipelineError::Transcription)?
                .text;
            self.checkpoint(
                id,
                Stage::Transcribe,
                JobPatch::progress(60).with_transcript(text.clone()),
                logger,
            )
            .await?;

            if options.runs_scene_detection() {
                let analysis = self
                    .timed(Stage::DetectScenes, self.caps.analyzer.analyze(&text))
                    .await?
                    .map_err(PipelineError::Analysis)?;
                self.checkpoint(
                    id,
                    Stage::DetectScenes,
                    JobPatch::progress(80).with_scenes(analysis.scenes),
                    logger,
                )
                .await?;
            } else {
                logger.log_skip(Stage::DetectScenes, "scene detection disabled");
            }

            transcript = Some(text);
        } else {
            logger.log_skip(Stage::Transcribe, "transcription disabled");
            if options.detect_scenes {
                logger.log_skip(Stage::DetectScenes, "requires a transcript");
            }
        }

        let mut filters = FilterChain::for_output(options);
        if let Some(text) = transcript.as_deref().filter(|t| !t.trim().is_empty()) {
            let srt = ws.subtitles_path();
            write_srt(&srt, text)
                .await
                .map_err(|e| PipelineError::transcode(Stage::Subtitles, e))?;
            filters = filters.subtitles(&srt, self.subtitle_style.clone());
            self.checkpoint(id, Stage::Subtitles, JobPatch::progress(90), logger)
                .await?;
        }

        let staged = ws.render_path();
        let spec = RenderSpec {
            filters,
            encoding: self.encoding.clone(),
        };
        let request = TranscodeRequest::render(&input, &staged, spec);
        let rendered = self
            .timed(Stage::Render, self.caps.transcoder.transcode(&request))
            .await?
            .map_err(|e| PipelineError::transcode(Stage::Render, e))?;

        let artifact = artifact_file_name(id);
        let dest = self.config.output_dir.join(&artifact);
        move_file(&rendered, &dest)
            .await
            .map_err(|e| PipelineError::transcode(Stage::Render, e))?;

        // No record points at the file unless the completion write lands
        if let Err(e) = self
            .checkpoint(id, Stage::Render, JobPatch::complete(artifact.clone()), logger)
            .await
        {
            if let Err(rm) = tokio::fs::remove_file(&dest).await {
                warn!(job_id = %id, path = %dest.display(), error = %rm, "Failed to remove unrecorded artifact");
            }
            return Err(e);
        }

        Ok(artifact)
    }

    /// Locate or fetch the input video.
    async fn acquire(
        &self,
        job: &Job,
        ws: &JobWorkspace,
        logger: &JobLogger,
    ) -> PipelineResult<PathBuf> {
        match &job.source {
            SourceRef::Upload(file) => {
                self.write(job.id, Stage::Acquire, &JobPatch::start(UPLOAD_START_PROGRESS))
                    .await?;

                let path = self.config.upload_dir.join(&file.filename);
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(PipelineError::acquisition(format!(
                        "uploaded file {} not found",
                        file.filename
                    )));
                }

                self.checkpoint(job.id, Stage::Acquire, JobPatch::progress(20), logger)
                    .await?;
                Ok(path)
            }
            SourceRef::Remote(remote) => {
                self.write(job.id, Stage::Acquire, &JobPatch::start(REMOTE_START_PROGRESS))
                    .await?;

                let dest = ws.download_path();
                let path = self
                    .timed(Stage::Acquire, self.caps.fetcher.fetch(&remote.url, &dest))
                    .await?
                    .map_err(|e| PipelineError::acquisition(e.to_string()))?;

                self.checkpoint(job.id, Stage::Acquire, JobPatch::progress(20), logger)
                    .await?;
                Ok(path)
            }
        }
    }

    /// Run one external invocation under the stage timeout, recording its duration.
    async fn timed<T, F>(&self, stage: Stage, fut: F) -> PipelineResult<T>
    where
        F: Future<Output = T>,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.config.stage_timeout, fut).await;
        metrics::record_stage_duration(stage, started.elapsed());

        result.map_err(|_| PipelineError::Timeout {
            stage,
            secs: self.config.stage_timeout.as_secs(),
        })
    }

    async fn checkpoint(
        &self,
        id: JobId,
        stage: Stage,
        patch: JobPatch,
        logger: &JobLogger,
    ) -> PipelineResult<()> {
        self.write(id, stage, &patch).await?;
        logger.log_stage(stage, patch.progress.unwrap_or_else(|| stage.checkpoint()));
        Ok(())
    }

    async fn write(&self, id: JobId, stage: Stage, patch: &JobPatch) -> PipelineResult<()> {
        match self.store.update(id, patch).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(PipelineError::JobMissing { stage, id }),
            Err(e) => Err(PipelineError::store(stage, e)),
        }
    }

    /// Record the failure; a store that cannot take the write is only logged.
    async fn fail(&self, id: JobId, err: &PipelineError, logger: &JobLogger) {
        let message = err.to_string();
        logger.log_error(&message);
        metrics::record_job_failed(err.stage().as_str());

        match self.store.update(id, &JobPatch::fail(message)).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(job_id = %id, "Job disappeared before its failure could be recorded"),
            Err(e) => error!(
                job_id = %id,
                error = %e,
                "Could not record job failure; the stored record is now stale"
            ),
        }
    }
}
