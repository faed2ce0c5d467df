use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::error::PipelineError;

/// Create `dir` and any missing parents.
pub async fn ensure_dir(dir: &Path) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))
}

/// Whether `path` exists. Errors while checking count as "does not exist".
pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Whether `path` is a regular file with at least one byte in it.
pub async fn is_nonempty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Age of a directory.
///
/// Uses the creation time where the filesystem records one and falls back to
/// the last-modified time otherwise. Writing files into a directory bumps its
/// mtime, so creation time is what actually tracks how old the contents are.
pub async fn dir_age(dir: &Path) -> Result<Duration, PipelineError> {
    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))?;
    let stamp = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map_err(|e| PipelineError::io(dir, e))?;

    // A timestamp in the future (clock skew) counts as brand new.
    Ok(SystemTime::now()
        .duration_since(stamp)
        .unwrap_or(Duration::ZERO))
}

/// Delete `dir` with everything in it and recreate it empty.
pub async fn reset_dir(dir: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Directory already gone before reset");
        }
        Err(e) => return Err(PipelineError::io(dir, e)),
    }
    ensure_dir(dir).await
}
