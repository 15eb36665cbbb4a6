//! Job-scoped scratch directories.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;
use vforge_models::JobId;

/// Private working area for one run of one job.
///
/// The directory name carries a random suffix, so two runs never share paths.
#[derive(Debug)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    pub async fn create(work_dir: &Path, id: JobId) -> std::io::Result<Self> {
        let root = work_dir.join(format!("job-{}-{}", id, Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&root).await?;
        debug!(job_id = %id, path = %root.display(), "Created job workspace");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remote download target.
    pub fn download_path(&self) -> PathBuf {
        self.root.join("source.mp4")
    }

    pub fn audio_path(&self) -> PathBuf {
        self.root.join("audio.wav")
    }

    pub fn subtitles_path(&self) -> PathBuf {
        self.root.join("subtitles.srt")
    }

    /// Render target before the artifact is moved into the output area.
    pub fn render_path(&self) -> PathBuf {
        self.root.join("render.mp4")
    }

    /// Best-effort removal of everything in the workspace.
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.root.display(), error = %e, "Failed to remove job workspace");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_workspaces_are_unique_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let a = JobWorkspace::create(dir.path(), JobId::new(1)).await.unwrap();
        let b = JobWorkspace::create(dir.path(), JobId::new(1)).await.unwrap();
        assert_ne!(a.root(), b.root());
        assert_ne!(a.audio_path(), b.audio_path());

        tokio::fs::write(a.audio_path(), b"pcm").await.unwrap();
        let root = a.root().to_path_buf();
        a.cleanup().await;
        assert!(!root.exists());
        assert!(b.root().exists());
    }
}
