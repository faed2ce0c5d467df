//! Versioned markup patterns.
//!
//! The thread list is scraped with regular expressions rather than a DOM
//! parser. Each pattern is tied to the forum's current markup and breaks when
//! the site is redesigned, so they live together in one replaceable bundle.

use std::sync::LazyLock;

use regex::Regex;

/// Raw pattern sources, compiled by [`MarkupPatterns::from_sources`].
///
/// Group names are part of the contract:
/// - `thread_boundary`: group 1 is the thread fragment
/// - `title_link`: `link` and `title`
/// - `abstract_text`: `abstract`
/// - `image`: `url`
/// - `video_cover`: `url`
#[derive(Debug, Clone)]
pub struct PatternSources<'a> {
    pub version: &'a str,
    pub pinned_marker: &'a str,
    pub thread_boundary: &'a str,
    pub title_link: &'a str,
    pub abstract_text: &'a str,
    pub image: &'a str,
    pub video_cover: &'a str,
}

/// Tieba thread list markup as of the `v1` layout.
pub const TIEBA_V1: PatternSources<'static> = PatternSources {
    version: "tieba-v1",
    // Removing the class attribute also removes the thread-list marker, so the
    // boundary pattern never sees pinned threads.
    pinned_marker: r#"(?s)class="[^">]*thread_top[^">]*""#,
    thread_boundary: r#"(?s)<li[^>]*class="[^">]*j_thread_list[^">]*"[^>]*>(.*?)最后回复人:"#,
    title_link: r#"(?s)<a[^>]*href="(?P<link>[^">]+)"[^>]*class="[^>"]*j_th_tit[^>"]*"[^>]*>(?P<title>[^<]+?)<"#,
    abstract_text: r#"(?s)<div[^>]*class="[^">]*threadlist_abs_onlyline[^">]*"[^>]*>(?P<abstract>[^<]*?)<"#,
    image: r#"(?s)<img[^>]*data-original="(?P<url>[^"]+?)""#,
    video_cover: r#"(?s)<a[^>]*class="[^">]*threadlist_btn_play[^">]*"[^>]*data-thumbnail="(?P<url>[^"]+?)""#,
};

static TIEBA_V1_COMPILED: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::from_sources(&TIEBA_V1).expect("built-in tieba patterns compile")
});

/// Compiled pattern bundle used by the extractor.
#[derive(Debug, Clone)]
pub struct MarkupPatterns {
    pub version: String,
    pub pinned_marker: Regex,
    pub thread_boundary: Regex,
    pub title_link: Regex,
    pub abstract_text: Regex,
    pub image: Regex,
    pub video_cover: Regex,
}

impl MarkupPatterns {
    /// Compile a pattern bundle.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn from_sources(sources: &PatternSources<'_>) -> Result<Self, regex::Error> {
        Ok(Self {
            version: sources.version.to_string(),
            pinned_marker: Regex::new(sources.pinned_marker)?,
            thread_boundary: Regex::new(sources.thread_boundary)?,
            title_link: Regex::new(sources.title_link)?,
            abstract_text: Regex::new(sources.abstract_text)?,
            image: Regex::new(sources.image)?,
            video_cover: Regex::new(sources.video_cover)?,
        })
    }

    /// The built-in Tieba patterns.
    #[must_use]
    pub fn tieba_v1() -> Self {
        TIEBA_V1_COMPILED.clone()
    }
}

impl Default for MarkupPatterns {
    fn default() -> Self {
        Self::tieba_v1()
    }
}
