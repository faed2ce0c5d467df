use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::trace;

use super::CacheStore;
use crate::models::CacheRecord;

/// One JSON document per key under a cache directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read cache file: {}", path.display()))
            }
        };

        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt cache file: {}", path.display()))?;
        Ok(Some(record))
    }

    async fn set(&self, key: &str, record: &CacheRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(record).context("Failed to serialize cache record")?;

        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        // Rename is atomic on the same filesystem, so readers never see half a record.
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;

        trace!(key = %key, path = %path.display(), "Cache record written");
        Ok(())
    }
}
