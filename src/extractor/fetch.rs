//! Forum page fetching.

use tracing::debug;

use super::{extract_posts, MarkupPatterns};
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::Post;

/// Thread list URL for a forum, also the page the widget opens on tap.
#[must_use]
pub fn forum_page_url(base_url: &str, forum: &str) -> String {
    format!(
        "{}/f?kw={}&ie=utf-8",
        base_url.trim_end_matches('/'),
        urlencoding::encode(forum)
    )
}

/// Fetch the raw thread list markup for `forum`.
///
/// # Errors
///
/// Returns an error on transport failure, a non-success status, or an empty
/// or non-text body.
pub async fn fetch_forum_html(
    client: &reqwest::Client,
    base_url: &str,
    forum: &str,
) -> Result<String, PipelineError> {
    let url = forum_page_url(base_url, forum);
    debug!(url = %url, "Fetching thread list");

    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::HttpStatus { url, status });
    }

    let is_text = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.starts_with("text/") || ct.contains("html") || ct.contains("xml"));
    if !is_text {
        return Err(PipelineError::NotText { url });
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(PipelineError::NotText { url });
    }
    Ok(body)
}

/// Fetch and extract the thread list for `forum`.
///
/// # Errors
///
/// Returns [`PipelineError::NoData`] if the page yields no usable thread, or
/// the fetch error.
pub async fn fetch_posts(
    client: &reqwest::Client,
    config: &Config,
    patterns: &MarkupPatterns,
    forum: &str,
) -> Result<Vec<Post>, PipelineError> {
    let html = fetch_forum_html(client, &config.forum_base_url, forum).await?;
    extract_posts(&html, &config.forum_base_url, config.max_posts, patterns)
        .ok_or(PipelineError::NoData)
}
