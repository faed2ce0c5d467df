//! Top-level entry pipeline.
//!
//! One call to [`Pipeline::get_entry`] is one widget invocation: resolve the
//! cached state, refetch or finish downloads as needed under deadlines, and
//! always hand back a best-effort [`Entry`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::cache::{is_fresh, CacheStore};
use crate::config::Config;
use crate::constants::FORUM_USER_AGENT;
use crate::deadline::run_with_deadline;
use crate::extractor::{fetch_posts, forum_page_url, MarkupPatterns};
use crate::images::ImageDownloader;
use crate::models::{CacheRecord, Entry, Post};

/// Acquisition pipeline for forum thread lists.
pub struct Pipeline {
    config: Arc<Config>,
    client: reqwest::Client,
    store: Arc<dyn CacheStore>,
    patterns: Arc<MarkupPatterns>,
    downloader: ImageDownloader,
}

impl Pipeline {
    /// Create a pipeline with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config, store: Arc<dyn CacheStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(FORUM_USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(config, store, client))
    }

    /// Create a pipeline around an existing HTTP client.
    #[must_use]
    pub fn with_client(config: Config, store: Arc<dyn CacheStore>, client: reqwest::Client) -> Self {
        let downloader = ImageDownloader::new(client.clone(), &config);
        Self {
            config: Arc::new(config),
            client,
            store,
            patterns: Arc::new(MarkupPatterns::tieba_v1()),
            downloader,
        }
    }

    /// Replace the markup patterns, e.g. after the forum changes its layout.
    #[must_use]
    pub fn with_patterns(mut self, patterns: MarkupPatterns) -> Self {
        self.patterns = Arc::new(patterns);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Page the renderer should open for `key`.
    #[must_use]
    pub fn page_url(&self, key: &str) -> String {
        forum_page_url(&self.config.forum_base_url, key)
    }

    /// Directory the images for `key` are written to.
    #[must_use]
    pub fn image_dir_for(&self, key: &str) -> PathBuf {
        self.downloader.destination_for(key)
    }

    /// Produce the entry for forum `key`.
    ///
    /// Never fails: on any error the last cached record is returned, and if
    /// there is none the entry is empty.
    pub async fn get_entry(&self, key: &str, force_refresh: bool) -> Entry {
        let key = key.trim();
        if key.is_empty() {
            debug!("No forum configured");
            return Entry::empty();
        }

        let cached = self.load(key).await;
        let fresh = !force_refresh
            && is_fresh(
                cached.as_ref(),
                Utc::now(),
                self.config.refresh_interval_minutes,
            );

        match cached {
            Some(record) if fresh => self.serve_cached(key, record).await,
            cached => self.refresh_or_fallback(key, cached).await,
        }
    }

    /// Serve a fresh record, finishing any incomplete image downloads first.
    async fn serve_cached(&self, key: &str, mut record: CacheRecord) -> Entry {
        debug!(key = %key, fetched_at = %record.fetched_at, "Using fresh cache");

        if !record.images_fully_downloaded {
            info!(key = %key, "Retrying incomplete image downloads");
            let dst = self.downloader.destination_for(key);
            record.images_fully_downloaded = self
                .downloader
                .download_batch(
                    &dst,
                    &mut record.items,
                    self.config.image_fetch_timeout,
                    true,
                )
                .await;
            self.save(key, &record).await;
        }

        Entry::from_record(record)
    }

    /// Refetch the thread list; fall back to `cached` (fresh or not) if that
    /// yields nothing.
    async fn refresh_or_fallback(&self, key: &str, cached: Option<CacheRecord>) -> Entry {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let patterns = Arc::clone(&self.patterns);
        let forum = key.to_string();

        let fetched = run_with_deadline(self.config.post_fetch_timeout, async move {
            fetch_posts(&client, &config, &patterns, &forum).await
        })
        .await;

        match fetched {
            Ok(items) => self.store_fresh(key, items).await,
            Err(e) => {
                warn!(key = %key, "Thread list unavailable: {e}");
                match cached {
                    Some(record) => {
                        info!(key = %key, fetched_at = %record.fetched_at, "Falling back to cached threads");
                        Entry::from_record(record)
                    }
                    None => Entry::empty(),
                }
            }
        }
    }

    /// Persist a newly fetched thread list and download its images.
    async fn store_fresh(&self, key: &str, items: Vec<Post>) -> Entry {
        info!(key = %key, count = items.len(), "Fetched thread list");
        let mut record = CacheRecord {
            items,
            fetched_at: Utc::now(),
            images_fully_downloaded: false,
        };

        // Checkpoint before downloading so a killed invocation keeps the new list.
        self.save(key, &record).await;

        let dst = self.downloader.destination_for(key);
        record.images_fully_downloaded = self
            .downloader
            .download_batch(
                &dst,
                &mut record.items,
                self.config.image_fetch_timeout,
                false,
            )
            .await;
        self.save(key, &record).await;

        Entry::from_record(record)
    }

    async fn load(&self, key: &str) -> Option<CacheRecord> {
        match self.store.get(key).await {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key, "Ignoring unreadable cache record: {e:#}");
                None
            }
        }
    }

    async fn save(&self, key: &str, record: &CacheRecord) {
        if let Err(e) = self.store.set(key, record).await {
            error!(key = %key, "Failed to persist cache record: {e:#}");
        }
    }
}
