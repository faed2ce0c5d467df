use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{IMAGES_WITHOUT_ABSTRACT, IMAGES_WITH_ABSTRACT};

/// One forum thread as shown by the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Entity-decoded thread title.
    pub title: String,
    /// Absolute thread URL.
    pub link: String,
    /// Entity-decoded summary; never `Some("")`.
    #[serde(default)]
    pub abstract_text: Option<String>,
    /// Remote image URLs in document order, video cover last.
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Set once the download attempt for this thread is exhausted.
    #[serde(default)]
    pub image_downloaded: bool,
    /// Local files written so far, in completion order.
    #[serde(default)]
    pub image_paths: Vec<String>,
}

impl Post {
    #[must_use]
    pub fn new(title: String, link: String) -> Self {
        Self {
            title,
            link,
            abstract_text: None,
            image_urls: Vec::new(),
            image_downloaded: false,
            image_paths: Vec::new(),
        }
    }

    #[must_use]
    pub fn has_abstract(&self) -> bool {
        self.abstract_text.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Maximum number of images kept for this thread.
    #[must_use]
    pub fn image_cap(&self) -> usize {
        if self.has_abstract() {
            IMAGES_WITH_ABSTRACT
        } else {
            IMAGES_WITHOUT_ABSTRACT
        }
    }
}

/// Persisted state for one forum page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub items: Vec<Post>,
    pub fetched_at: DateTime<Utc>,
    pub images_fully_downloaded: bool,
}

/// What the renderer receives from one invocation.
///
/// `items == None` means there is nothing to show; the renderer draws its
/// error/help state in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub items: Option<Vec<Post>>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Entry {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_record(record: CacheRecord) -> Self {
        Self {
            items: Some(record.items),
            fetched_at: Some(record.fetched_at),
        }
    }

    #[must_use]
    pub fn has_items(&self) -> bool {
        self.items.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_cap_depends_on_abstract() {
        let mut post = Post::new("t".to_string(), "https://example.com/p/1".to_string());
        assert_eq!(post.image_cap(), 3);

        post.abstract_text = Some("summary".to_string());
        assert_eq!(post.image_cap(), 1);

        post.abstract_text = Some(String::new());
        assert_eq!(post.image_cap(), 3);
    }

    #[test]
    fn test_record_deserializes_without_download_fields() {
        let json = r#"{
            "items": [{"title": "a", "link": "https://example.com/p/1"}],
            "fetched_at": "2024-01-01T12:00:00Z",
            "images_fully_downloaded": false
        }"#;
        let record: CacheRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.items.len(), 1);
        assert!(record.items[0].image_urls.is_empty());
        assert!(!record.items[0].image_downloaded);
    }

    #[test]
    fn test_empty_entry() {
        let entry = Entry::empty();
        assert!(!entry.has_items());
        assert!(entry.fetched_at.is_none());
    }
}
