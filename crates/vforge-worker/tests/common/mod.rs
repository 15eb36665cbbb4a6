//! Fakes and a harness shared by the worker integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use vforge_ai::{AiError, AiResult, ContentAnalyzer, Transcriber, Transcription};
use vforge_media::{
    MediaError, MediaResult, RenderSpec, SourceFetcher, TranscodeRequest, TranscodeSpec, Transcoder,
};
use vforge_models::{
    ContentAnalysis, Job, JobId, JobPatch, JobStatus, NewJob, ProcessingOptions, Scene, SourceRef,
};
use vforge_store::{JobStore, MemoryJobStore, StoreResult};
use vforge_worker::{Capabilities, JobService, Orchestrator, Scheduler, WorkerConfig};

pub const TRANSCRIPT: &str = "welcome to the show today we talk about rust and video pipelines";

#[derive(Default)]
pub struct FakeTranscoder {
    pub requests: Mutex<Vec<TranscodeRequest>>,
    pub fail_extract: bool,
    pub fail_render: bool,
    pub panic_on_render: bool,
    pub delay: Option<Duration>,
    /// When set, every call waits for a permit first
    pub gate: Option<Arc<Semaphore>>,
}

impl FakeTranscoder {
    pub fn requests(&self) -> Vec<TranscodeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn render_specs(&self) -> Vec<RenderSpec> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r.spec {
                TranscodeSpec::Render(spec) => Some(spec),
                TranscodeSpec::ExtractAudio(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> MediaResult<PathBuf> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &request.spec {
            TranscodeSpec::ExtractAudio(_) if self.fail_extract => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with code 1: Invalid data found when processing input",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            )),
            TranscodeSpec::Render(_) if self.panic_on_render => panic!("encoder exploded"),
            TranscodeSpec::Render(_) if self.fail_render => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with code 1: Error initializing filter",
                Some("Error initializing filter".to_string()),
                Some(1),
            )),
            _ => {
                tokio::fs::write(&request.output, b"media").await?;
                Ok(request.output.clone())
            }
        }
    }
}

pub struct FakeTranscriber {
    pub text: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl Default for FakeTranscriber {
    fn default() -> Self {
        Self {
            text: TRANSCRIPT.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeTranscriber {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saying(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &Path) -> AiResult<Transcription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio.exists(), "audio should be extracted before transcription");
        if self.fail {
            return Err(AiError::from_status(429, "rate limit reached for whisper-1"));
        }
        Ok(Transcription {
            text: self.text.clone(),
        })
    }
}

pub struct FakeAnalyzer {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl Default for FakeAnalyzer {
    fn default() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeAnalyzer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _transcript: &str) -> AiResult<ContentAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AiError::invalid_response("analysis JSON did not match: missing field `scenes`"));
        }
        Ok(ContentAnalysis {
            scenes: vec![
                Scene::new(0.0, 6.0, 0.9).with_description("intro"),
                Scene::new(6.0, 12.0, 0.6),
            ],
            highlights: vec!["rust".to_string()],
        })
    }
}

/// Writes a small file to the requested destination.
#[derive(Default)]
pub struct FakeFetcher {
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<PathBuf> {
        self.urls.lock().unwrap().push(url.to_string());
        tokio::fs::write(dest, b"downloaded").await?;
        Ok(dest.to_path_buf())
    }
}

/// Memory store that remembers every progress value written.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryJobStore,
    history: Mutex<Vec<(JobId, u8)>>,
    /// Delete the job instead of applying its completion write
    pub drop_on_complete: AtomicBool,
}

impl RecordingStore {
    pub fn progress_history(&self, id: JobId) -> Vec<u8> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(job, _)| *job == id)
            .map(|(_, progress)| *progress)
            .collect()
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn create(&self, request: NewJob) -> StoreResult<Job> {
        self.inner.create(request).await
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>> {
        self.inner.get(id).await
    }

    async fn update(&self, id: JobId, patch: &JobPatch) -> StoreResult<Option<Job>> {
        if patch.status == Some(JobStatus::Completed) && self.drop_on_complete.load(Ordering::SeqCst) {
            self.inner.delete(id).await?;
            return Ok(None);
        }
        let updated = self.inner.update(id, patch).await?;
        if let (Some(job), Some(_)) = (&updated, patch.progress) {
            self.history.lock().unwrap().push((id, job.progress));
        }
        Ok(updated)
    }

    async fn delete(&self, id: JobId) -> StoreResult<bool> {
        self.inner.delete(id).await
    }

    async fn list_all(&self) -> StoreResult<Vec<Job>> {
        self.inner.list_all().await
    }
}

pub struct Fakes {
    pub transcoder: FakeTranscoder,
    pub transcriber: FakeTranscriber,
    pub analyzer: FakeAnalyzer,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub stage_timeout: Duration,
    pub max_jobs: usize,
    pub remote_sources: bool,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            transcoder: FakeTranscoder::default(),
            transcriber: FakeTranscriber::default(),
            analyzer: FakeAnalyzer::default(),
            fetcher: Arc::new(FakeFetcher::default()),
            stage_timeout: Duration::from_secs(30),
            max_jobs: 2,
            remote_sources: true,
        }
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub config: WorkerConfig,
    pub store: Arc<RecordingStore>,
    pub transcoder: Arc<FakeTranscoder>,
    pub transcriber: Arc<FakeTranscriber>,
    pub analyzer: Arc<FakeAnalyzer>,
    pub orchestrator: Arc<Orchestrator>,
    pub scheduler: Scheduler,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(Fakes::default()).await
    }

    pub async fn with(fakes: Fakes) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkerConfig::default()
            .with_root(dir.path())
            .with_max_concurrent_jobs(fakes.max_jobs)
            .with_stage_timeout(fakes.stage_timeout);
        config.remote_sources = fakes.remote_sources;
        config.ensure_dirs().await.unwrap();

        let store = Arc::new(RecordingStore::default());
        let transcoder = Arc::new(fakes.transcoder);
        let transcriber = Arc::new(fakes.transcriber);
        let analyzer = Arc::new(fakes.analyzer);

        let caps = Capabilities {
            transcoder: transcoder.clone(),
            transcriber: transcriber.clone(),
            analyzer: analyzer.clone(),
            fetcher: fakes.fetcher,
        };
        let store_dyn: Arc<dyn JobStore> = store.clone();
        let orchestrator = Arc::new(Orchestrator::new(store_dyn, caps, config.clone()));
        let scheduler = Scheduler::new(Arc::clone(&orchestrator), config.max_concurrent_jobs);

        Self {
            dir,
            config,
            store,
            transcoder,
            transcriber,
            analyzer,
            orchestrator,
            scheduler,
        }
    }

    pub fn store_dyn(&self) -> Arc<dyn JobStore> {
        self.store.clone()
    }

    pub fn service(&self) -> JobService {
        JobService::new(self.store_dyn(), self.scheduler.clone(), self.config.clone())
    }

    /// Put a file in the upload area and create a pending job for it.
    pub async fn upload_job(&self, options: ProcessingOptions) -> JobId {
        let name = format!("upload-{}.mp4", next_upload_suffix());
        tokio::fs::write(self.config.upload_dir.join(&name), b"video").await.unwrap();
        self.store
            .create(NewJob::new(SourceRef::upload(name, Some("clip.mp4".into())), options))
            .await
            .unwrap()
            .id
    }

    pub async fn job(&self, id: JobId) -> Job {
        self.store.get(id).await.unwrap().unwrap()
    }

    pub async fn assert_status(&self, id: JobId, status: JobStatus) -> Job {
        let job = self.job(id).await;
        assert_eq!(job.status, status, "job: {:?}", job);
        assert!(job.outcome_is_consistent());
        job
    }

    /// Entries left in the scratch area.
    pub fn work_entries(&self) -> usize {
        std::fs::read_dir(&self.config.work_dir).unwrap().count()
    }

    /// Files in the artifact area.
    pub fn output_entries(&self) -> usize {
        std::fs::read_dir(&self.config.output_dir).unwrap().count()
    }
}

fn next_upload_suffix() -> String {
    use std::sync::atomic::AtomicU64;
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::SeqCst).to_string()
}

pub fn options(transcribe: bool, detect_scenes: bool) -> ProcessingOptions {
    ProcessingOptions {
        transcribe,
        detect_scenes,
        ..ProcessingOptions::default()
    }
}
