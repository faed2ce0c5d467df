use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use tracing::debug;

use crate::error::PipelineError;

/// Byte length advertised by a response, if any.
fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Ask the server for an image's size without downloading it.
///
/// # Errors
///
/// Returns an error on transport failure or a non-success status.
pub async fn probe_size(client: &reqwest::Client, url: &str) -> Result<Option<u64>, PipelineError> {
    let response = client.head(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::HttpStatus {
            url: url.to_string(),
            status,
        });
    }
    // `Response::content_length` reports the (empty) HEAD body, not the header.
    Ok(content_length(response.headers()))
}

/// Keep, in order, the first `max_count` URLs whose probed size is known and
/// at most `max_bytes`.
///
/// A URL that is too large, has no advertised size, or fails to probe is
/// dropped for this call.
pub async fn select_images(
    client: &reqwest::Client,
    urls: &[String],
    max_bytes: u64,
    max_count: usize,
) -> Vec<String> {
    let mut selected = Vec::new();
    if max_count == 0 {
        return selected;
    }

    for url in urls {
        match probe_size(client, url).await {
            Ok(Some(size)) if size <= max_bytes => {
                selected.push(url.clone());
                if selected.len() >= max_count {
                    break;
                }
            }
            Ok(Some(size)) => {
                debug!(url = %url, size, max_bytes, "Image too large, skipping");
            }
            Ok(None) => {
                debug!(url = %url, "Image size unknown, skipping");
            }
            Err(e) => {
                debug!(url = %url, "Image probe failed, skipping: {e}");
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sized(len: usize) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-length", len.to_string().as_str())
            .set_body_bytes(vec![0u8; len])
    }

    async fn mount_head(server: &MockServer, route: &str, len: usize) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(sized(len))
            .mount(server)
            .await;
    }

    #[test]
    fn test_content_length_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1234"));
        assert_eq!(content_length(&headers), Some(1234));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("huge"));
        assert_eq!(content_length(&headers), None);
    }

    #[tokio::test]
    async fn test_filters_by_size_and_keeps_order() {
        let server = MockServer::start().await;
        mount_head(&server, "/big.jpg", 2_000).await;
        mount_head(&server, "/small1.jpg", 100).await;
        mount_head(&server, "/exact.jpg", 1_000).await;

        let urls = vec![
            format!("{}/big.jpg", server.uri()),
            format!("{}/small1.jpg", server.uri()),
            format!("{}/exact.jpg", server.uri()),
        ];
        let client = reqwest::Client::new();

        let selected = select_images(&client, &urls, 1_000, 3).await;

        assert_eq!(selected, vec![urls[1].clone(), urls[2].clone()]);
    }

    #[tokio::test]
    async fn test_stops_at_max_count() {
        let server = MockServer::start().await;
        mount_head(&server, "/1.jpg", 10).await;
        mount_head(&server, "/2.jpg", 10).await;
        // Never probed once the cap is reached
        Mock::given(method("HEAD"))
            .and(path("/3.jpg"))
            .respond_with(sized(10))
            .expect(0)
            .mount(&server)
            .await;

        let urls: Vec<_> = (1..=3).map(|i| format!("{}/{i}.jpg", server.uri())).collect();
        let client = reqwest::Client::new();

        let selected = select_images(&client, &urls, 1_000, 2).await;
        assert_eq!(selected.len(), 2);
        assert_eq!(selected, urls[..2]);
    }

    #[tokio::test]
    async fn test_failed_probe_is_excluded() {
        let server = MockServer::start().await;
        mount_head(&server, "/ok.jpg", 10).await;
        // No mock for /missing.jpg: wiremock answers 404

        let urls = vec![
            format!("{}/missing.jpg", server.uri()),
            format!("{}/ok.jpg", server.uri()),
        ];
        let client = reqwest::Client::new();

        let selected = select_images(&client, &urls, 1_000, 3).await;
        assert_eq!(selected, vec![urls[1].clone()]);
    }

    #[tokio::test]
    async fn test_zero_cap_selects_nothing() {
        let client = reqwest::Client::new();
        let urls = vec!["http://127.0.0.1:9/never.jpg".to_string()];
        assert!(select_images(&client, &urls, 1_000, 0).await.is_empty());
    }
}
