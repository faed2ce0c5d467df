//! Thread list extraction.
//!
//! Raw forum markup is split into one fragment per thread and each fragment is
//! parsed on its own; a broken fragment is logged and skipped without
//! affecting its siblings.

pub mod entities;
pub mod fetch;
pub mod patterns;

pub use entities::decode_entities;
pub use fetch::{fetch_forum_html, fetch_posts, forum_page_url};
pub use patterns::{MarkupPatterns, PatternSources, TIEBA_V1};

use tracing::{debug, warn};

use crate::error::FragmentError;
use crate::models::Post;

/// Extract up to `max_items` threads from `html`, in document order.
///
/// Pinned threads are dropped before splitting. Returns `None` when no
/// fragment yields a usable thread, so callers can fall back to their cache
/// instead of storing an empty list.
#[must_use]
pub fn extract_posts(
    html: &str,
    base_url: &str,
    max_items: usize,
    patterns: &MarkupPatterns,
) -> Option<Vec<Post>> {
    let html = patterns.pinned_marker.replace_all(html, "");

    let mut posts = Vec::new();
    for caps in patterns.thread_boundary.captures_iter(&html) {
        if posts.len() >= max_items {
            break;
        }
        let Some(fragment) = caps.get(1) else {
            continue;
        };
        match parse_fragment(fragment.as_str(), base_url, patterns) {
            Ok(post) => posts.push(post),
            Err(e) => {
                warn!(
                    error = %e,
                    patterns = %patterns.version,
                    fragment = %fragment.as_str(),
                    "Skipping unparseable thread fragment"
                );
            }
        }
    }

    debug!(count = posts.len(), "Extracted threads");
    if posts.is_empty() {
        None
    } else {
        Some(posts)
    }
}

/// Parse one thread fragment into a [`Post`].
///
/// # Errors
///
/// Returns an error if the fragment has no title link.
pub fn parse_fragment(
    fragment: &str,
    base_url: &str,
    patterns: &MarkupPatterns,
) -> Result<Post, FragmentError> {
    let (title, link) = extract_title_link(fragment, base_url, patterns)?;

    let mut post = Post::new(title, link);
    post.abstract_text = extract_abstract(fragment, patterns);
    post.image_urls = extract_image_urls(fragment, patterns);
    if let Some(cover) = extract_video_cover(fragment, patterns) {
        if !post.image_urls.contains(&cover) {
            post.image_urls.push(cover);
        }
    }
    Ok(post)
}

fn extract_title_link(
    fragment: &str,
    base_url: &str,
    patterns: &MarkupPatterns,
) -> Result<(String, String), FragmentError> {
    let caps = patterns
        .title_link
        .captures(fragment)
        .ok_or(FragmentError::MissingTitleOrLink)?;
    let (Some(raw_title), Some(rel_link)) = (caps.name("title"), caps.name("link")) else {
        return Err(FragmentError::MissingTitleOrLink);
    };

    let title = decode_entities(raw_title.as_str().trim()).into_owned();
    if title.is_empty() {
        return Err(FragmentError::EmptyTitle);
    }
    Ok((title, absolutize(base_url, rel_link.as_str())))
}

fn extract_abstract(fragment: &str, patterns: &MarkupPatterns) -> Option<String> {
    let raw = patterns.abstract_text.captures(fragment)?.name("abstract")?;
    let text = decode_entities(raw.as_str().trim()).into_owned();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn extract_image_urls(fragment: &str, patterns: &MarkupPatterns) -> Vec<String> {
    patterns
        .image
        .captures_iter(fragment)
        .filter_map(|caps| caps.name("url").map(|m| m.as_str().to_string()))
        .collect()
}

fn extract_video_cover(fragment: &str, patterns: &MarkupPatterns) -> Option<String> {
    patterns
        .video_cover
        .captures(fragment)?
        .name("url")
        .map(|m| m.as_str().to_string())
}

/// Prefix a relative thread link with the site origin.
fn absolutize(base_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if link.starts_with('/') {
        format!("{base}{link}")
    } else {
        format!("{base}/{link}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://tieba.baidu.com";

    fn thread(id: u32, title: &str, extra: &str) -> String {
        format!(
            r#"<li class=" j_thread_list clearfix thread_item_box" data-field='{{"id":{id}}}'>
  <div class="threadlist_title pull_left j_th_tit">
    <a rel="noopener" href="/p/{id}" title="{title}" target="_blank" class="j_th_tit ">{title}</a>
  </div>
  {extra}
  <span class="tb_icon_author_rely j_replyer" title="最后回复人: someone">"#
        )
    }

    fn pinned(id: u32, title: &str) -> String {
        format!(
            r#"<li class=" j_thread_list thread_top j_thread_list clearfix" data-field='{{"id":{id}}}'>
  <a rel="noopener" href="/p/{id}" title="{title}" target="_blank" class="j_th_tit ">{title}</a>
  <span class="tb_icon_author_rely j_replyer" title="最后回复人: admin">"#
        )
    }

    fn page(threads: &[String]) -> String {
        format!(
            r#"<html><body><ul id="thread_list" class="threadlist_bright j_threadlist_bright">{}</ul></body></html>"#,
            threads.join("\n")
        )
    }

    fn extract(html: &str, max: usize) -> Option<Vec<Post>> {
        extract_posts(html, BASE, max, &MarkupPatterns::tieba_v1())
    }

    #[test]
    fn test_pinned_thread_is_excluded_and_order_preserved() {
        let html = page(&[
            pinned(1, "Forum rules"),
            thread(2, "First", ""),
            thread(3, "Second", ""),
            thread(4, "Third", ""),
        ]);

        let posts = extract(&html, 20).unwrap();

        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
        assert!(posts.iter().all(|p| p.link != "https://tieba.baidu.com/p/1"));
    }

    #[test]
    fn test_pinned_thread_between_regular_threads() {
        let html = page(&[
            thread(2, "First", ""),
            pinned(1, "Sticky"),
            thread(3, "Second", ""),
        ]);

        let posts = extract(&html, 20).unwrap();

        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
    }

    #[test]
    fn test_broken_fragment_does_not_affect_siblings() {
        let broken = r#"<li class="j_thread_list clearfix"><div>no title link here</div>
  <span title="最后回复人: x">"#
            .to_string();
        let html = page(&[thread(2, "Before", ""), broken, thread(3, "After", "")]);

        let posts = extract(&html, 20).unwrap();

        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Before", "After"]);
    }

    #[test]
    fn test_fields_are_extracted_and_decoded() {
        let extra = r#"<div class="threadlist_abs threadlist_abs_onlyline ">
      Tom &amp; Jerry &lt;3
    </div>
    <ul class="threadlist_media j_threadlist_media clearfix">
      <li><img class="threadlist_pic j_m_pic" data-original="https://imgsa.example.com/forum/a.jpg" ></li>
      <li><img class="threadlist_pic j_m_pic" data-original="https://imgsa.example.com/forum/b.jpg" ></li>
    </ul>"#;
        let html = page(&[thread(7, "&quot;Hello&quot; &apos;world&apos;", extra)]);

        let posts = extract(&html, 20).unwrap();
        let post = &posts[0];

        assert_eq!(post.title, "\"Hello\" 'world'");
        assert_eq!(post.link, "https://tieba.baidu.com/p/7");
        assert_eq!(post.abstract_text.as_deref(), Some("Tom & Jerry <3"));
        assert_eq!(
            post.image_urls,
            [
                "https://imgsa.example.com/forum/a.jpg",
                "https://imgsa.example.com/forum/b.jpg"
            ]
        );
        assert!(!post.image_downloaded);
        assert!(post.image_paths.is_empty());
    }

    #[test]
    fn test_blank_abstract_is_absent() {
        let extra = r#"<div class="threadlist_abs threadlist_abs_onlyline ">   </div>"#;
        let html = page(&[thread(8, "Blank", extra)]);

        let posts = extract(&html, 20).unwrap();
        assert_eq!(posts[0].abstract_text, None);
        assert!(!posts[0].has_abstract());
    }

    #[test]
    fn test_video_cover_is_appended_last() {
        let extra = r#"<img data-original="https://img.example.com/1.jpg">
    <div class="threadlist_video">
      <a class="threadlist_btn_play j_m_flash" data-vhsrc="https://video.example.com/v.mp4" data-thumbnail="https://img.example.com/cover.jpg"></a>
    </div>"#;
        let html = page(&[thread(9, "Video", extra)]);

        let posts = extract(&html, 20).unwrap();
        assert_eq!(
            posts[0].image_urls,
            ["https://img.example.com/1.jpg", "https://img.example.com/cover.jpg"]
        );
    }

    #[test]
    fn test_video_cover_is_not_duplicated() {
        let extra = r#"<img data-original="https://img.example.com/cover.jpg">
    <a class="threadlist_btn_play" data-thumbnail="https://img.example.com/cover.jpg"></a>"#;
        let html = page(&[thread(10, "Video", extra)]);

        let posts = extract(&html, 20).unwrap();
        assert_eq!(posts[0].image_urls, ["https://img.example.com/cover.jpg"]);
    }

    #[test]
    fn test_stops_at_max_items() {
        let threads: Vec<_> = (1..=5).map(|i| thread(i, &format!("T{i}"), "")).collect();
        let posts = extract(&page(&threads), 2).unwrap();

        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["T1", "T2"]);
    }

    #[test]
    fn test_no_usable_threads_is_none() {
        assert!(extract("", 20).is_none());
        assert!(extract("<html><body>maintenance</body></html>", 20).is_none());
        assert!(extract(&page(&[pinned(1, "Only pinned")]), 20).is_none());
    }

    #[test]
    fn test_arbitrary_input_never_panics() {
        let inputs = [
            "<li class=\"j_thread_list\">最后回复人:",
            "<li class=\"j_thread_list\"><a href=\"\" class=\"j_th_tit\">x</a>最后回复人:",
            "最后回复人:最后回复人:<<<>>>\"\"\"",
            "<li class=\"j_thread_list\"><a href=\"/p/1\" class=\"j_th_tit\">   </a>最后回复人:",
        ];
        for input in inputs {
            assert!(extract(input, 20).is_none(), "input: {input}");
        }
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize(BASE, "/p/1"), "https://tieba.baidu.com/p/1");
        assert_eq!(absolutize("https://example.com/", "/p/1"), "https://example.com/p/1");
        assert_eq!(absolutize(BASE, "p/1"), "https://tieba.baidu.com/p/1");
        assert_eq!(
            absolutize(BASE, "https://other.example.com/p/1"),
            "https://other.example.com/p/1"
        );
    }
}
