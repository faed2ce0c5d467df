//! Per-forum image download with on-disk dedup and age-based eviction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::selector::select_images;
use crate::config::Config;
use crate::deadline::run_with_deadline;
use crate::error::PipelineError;
use crate::fs_utils;
use crate::models::Post;

/// Downloads preview images for a batch of threads into a per-forum
/// directory.
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: reqwest::Client,
    image_root: PathBuf,
    max_image_bytes: u64,
    eviction_interval: Duration,
}

impl ImageDownloader {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            image_root: config.image_dir.clone(),
            max_image_bytes: config.max_image_bytes,
            eviction_interval: config.image_eviction_interval,
        }
    }

    /// Directory holding the images of one forum.
    ///
    /// The key is URL-encoded so it can never name a path outside the root.
    #[must_use]
    pub fn destination_for(&self, key: &str) -> PathBuf {
        let encoded = urlencoding::encode(key);
        match encoded.as_ref() {
            "" | "." | ".." => self.image_root.join(short_digest(key)),
            name => self.image_root.join(name),
        }
    }

    /// Create the image root and `dst`, wiping `dst` first if it has outlived
    /// the eviction interval.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created or the expired
    /// directory cannot be removed.
    pub async fn prepare_destination(&self, dst: &Path) -> Result<(), PipelineError> {
        fs_utils::ensure_dir(&self.image_root).await?;
        fs_utils::ensure_dir(dst).await?;

        match fs_utils::dir_age(dst).await {
            Ok(age) if age > self.eviction_interval => {
                info!(
                    dir = %dst.display(),
                    age_secs = age.as_secs(),
                    "Evicting expired image directory"
                );
                fs_utils::reset_dir(dst).await?;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(dir = %dst.display(), "Could not determine image directory age: {e}");
            }
        }
        Ok(())
    }

    /// Download images for every post concurrently, giving up waiting after
    /// `deadline`.
    ///
    /// Each post's `image_paths`/`image_downloaded` are updated in place with
    /// whatever had completed when the batch settled or the deadline passed.
    /// Returns `true` only if every post finished successfully in time.
    /// Downloads still running after the deadline keep going in the
    /// background but can no longer affect `posts`.
    pub async fn download_batch(
        &self,
        dst: &Path,
        posts: &mut [Post],
        deadline: Duration,
        retry_pass: bool,
    ) -> bool {
        let setup = if retry_pass {
            fs_utils::ensure_dir(dst).await
        } else {
            self.prepare_destination(dst).await
        };
        if let Err(e) = setup {
            error!(dir = %dst.display(), retry_pass, "Failed to prepare image directory: {e}");
            return false;
        }

        // Every post gets its own lock; a straggler can only touch its own post.
        let shared: Arc<Vec<Mutex<Post>>> =
            Arc::new(posts.iter().cloned().map(Mutex::new).collect());
        let tasks = Arc::clone(&shared);
        let downloader = self.clone();
        let dir = dst.to_path_buf();

        let outcome = run_with_deadline(deadline, async move {
            let results = join_all(tasks.iter().map(|post| downloader.download_one(&dir, post))).await;
            Ok::<_, PipelineError>(results.into_iter().all(|ok| ok))
        })
        .await;

        for (slot, post) in posts.iter_mut().zip(shared.iter()) {
            *slot = post.lock().await.clone();
        }

        match outcome {
            Ok(all_succeeded) => {
                debug!(dir = %dst.display(), all_succeeded, "Image batch settled");
                all_succeeded
            }
            Err(e) => {
                warn!(dir = %dst.display(), retry_pass, "Image batch incomplete: {e}");
                false
            }
        }
    }

    /// Download the images of a single post.
    ///
    /// The selector picks up to the per-post cap first. A selected image
    /// already listed in `image_paths` is skipped, and one already complete on
    /// disk is recorded without fetching it again, so repeating the call is
    /// cheap. Returns `false` if any selected image failed; the post then
    /// stays not-downloaded for a later retry.
    pub async fn download_one(&self, dst: &Path, post: &Mutex<Post>) -> bool {
        let (urls, cap) = {
            let post = post.lock().await;
            if post.image_downloaded || post.image_urls.is_empty() {
                return true;
            }
            (post.image_urls.clone(), post.image_cap())
        };

        let selected = select_images(&self.client, &urls, self.max_image_bytes, cap).await;
        if selected.is_empty() {
            post.lock().await.image_downloaded = true;
            return true;
        }

        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for url in selected {
            let path = dst.join(image_file_name(&url));
            if !seen.insert(path.clone()) {
                continue;
            }
            let path_str = path.to_string_lossy().into_owned();
            if post.lock().await.image_paths.contains(&path_str) {
                continue;
            }
            if fs_utils::is_nonempty_file(&path).await {
                debug!(url = %url, path = %path_str, "Reusing image already on disk");
                post.lock().await.image_paths.push(path_str);
            } else {
                pending.push((url, path));
            }
        }

        let results = join_all(pending.iter().map(|(url, path)| async move {
            match self.fetch_image(url, path).await {
                Ok(()) => {
                    let path_str = path.to_string_lossy().into_owned();
                    let mut post = post.lock().await;
                    if !post.image_paths.contains(&path_str) {
                        post.image_paths.push(path_str);
                    }
                    true
                }
                Err(e) => {
                    warn!(url = %url, "Image download failed: {e}");
                    false
                }
            }
        }))
        .await;

        let all_succeeded = results.iter().all(|ok| *ok);
        if all_succeeded {
            post.lock().await.image_downloaded = true;
        }
        all_succeeded
    }

    /// Fetch `url` into `path`. The body is written to a `.part` sibling and
    /// renamed into place, so `path` only ever holds a complete image.
    async fn fetch_image(&self, url: &str, path: &Path) -> Result<(), PipelineError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await?;
        let part = part_path(path);
        if let Err(e) = tokio::fs::write(&part, &bytes).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(PipelineError::io(&part, e));
        }
        tokio::fs::rename(&part, path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;

        debug!(url = %url, path = %path.display(), size = bytes.len(), "Image saved");
        Ok(())
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Local file name for an image URL: its final path segment, or a digest of
/// the URL when there is no usable segment.
#[must_use]
pub fn image_file_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty() && s != "." && s != ".." && !s.contains('\\'))
        .unwrap_or_else(|| short_digest(url))
}

fn short_digest(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    hex::encode(&digest[..8])
}
