//! Filesystem helpers for publishing outputs atomically.
//!
//! Encoders write to a hidden partial file next to the destination; the file
//! is then moved into place, falling back to copy-and-rename when the move
//! crosses filesystems (EXDEV).

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// A unique hidden sibling of `output` to write into before publishing.
///
/// `/videos/run.mp4` becomes `/videos/.run.1a2b3c4d.partial.mp4`; the real
/// extension is kept so tools that infer the container from it still work.
pub fn partial_output_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let name = match output.extension() {
        Some(ext) => format!(".{stem}.{}.partial.{}", &tag[..8], ext.to_string_lossy()),
        None => format!(".{stem}.{}.partial", &tag[..8]),
    };
    output.with_file_name(name)
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Tries a rename first. On EXDEV the file is copied to a temporary sibling
/// of `dst` and renamed over it, so `dst` is never observed half-written.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    ensure_parent(dst).await?;

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Remove `path`, ignoring a file that is already gone.
pub async fn remove_if_exists(path: &Path) -> MediaResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// EXDEV is error code 18 on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    // Same directory as dst, hence same filesystem.
    let tmp_dst = partial_output_path(dst);

    fs::copy(src, &tmp_dst).await.map_err(|e| {
        tracing::error!(
            "Failed to copy file during cross-device move: {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    fs::rename(&tmp_dst, dst).await.map_err(|e| {
        let _ = std::fs::remove_file(&tmp_dst);
        tracing::error!(
            "Failed to rename temp file during cross-device move: {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source file after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_output_path_is_hidden_sibling() {
        let partial = partial_output_path(Path::new("/videos/run.mp4"));
        assert_eq!(partial.parent(), Some(Path::new("/videos")));

        let name = partial.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".run."));
        assert!(name.ends_with(".partial.mp4"));

        assert_ne!(partial, partial_output_path(Path::new("/videos/run.mp4")));
    }

    #[test]
    fn test_partial_output_path_without_extension() {
        let partial = partial_output_path(Path::new("out/video"));
        let name = partial.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".video."));
        assert!(name.ends_with(".partial"));
    }

    #[tokio::test]
    async fn test_move_file_same_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.mp4");
        let dst = dir.path().join("dest.mp4");

        fs::write(&src, b"video").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists(), "Source file should be removed");
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "video");
    }

    #[tokio::test]
    async fn test_move_file_creates_parent_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.mp4");
        let dst = dir.path().join("nested").join("dest.mp4");

        fs::create_dir_all(dst.parent().unwrap()).await.unwrap();
        fs::write(&dst, b"old").await.unwrap();
        fs::write(&src, b"new").await.unwrap();

        move_file(&src, &dst).await.unwrap();
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.mp4");
        remove_if_exists(&path).await.unwrap();

        fs::write(&path, b"x").await.unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
