//! File moves that survive crossing filesystems.
//!
//! Work directories and the output area may live on different mounts, so a
//! plain rename can fail with EXDEV.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// EXDEV on Linux and macOS.
const EXDEV: i32 = 18;

/// Move `src` to `dst`, creating the destination directory when needed.
///
/// Tries a rename first and falls back to copy, rename into place, then
/// delete of the source.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !fs::try_exists(src).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(EXDEV) => {
            debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device move, copying instead"
            );
            copy_then_remove(src, dst).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn copy_then_remove(src: &Path, dst: &Path) -> MediaResult<()> {
    // Stage next to the destination so the final rename stays on one device
    let staged = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &staged).await {
        let _ = fs::remove_file(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staged, dst).await {
        let _ = fs::remove_file(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!(src = %src.display(), error = %e, "Could not remove source after copy");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("render.mp4");
        let dst = dir.path().join("outputs").join("processed_1_0.mp4");
        fs::write(&src, b"video").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_move_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        move_file(&src, &dst).await.unwrap();
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = move_file(dir.path().join("nope"), dir.path().join("dst"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
