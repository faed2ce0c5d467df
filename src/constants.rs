//! Shared constants used across the crate.

/// User agent string used for forum and image requests.
///
/// The forum serves a reduced thread list to unknown clients, so requests look
/// like a regular desktop browser.
pub const FORUM_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Site origin that relative thread links are resolved against.
pub const DEFAULT_FORUM_BASE_URL: &str = "https://tieba.baidu.com";

/// Minutes a cached thread list stays fresh.
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 30;

/// Deadline for fetching and extracting the thread list.
pub const DEFAULT_POST_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Deadline for one image download batch.
pub const DEFAULT_IMAGE_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Maximum number of threads kept per fetch.
pub const DEFAULT_MAX_POSTS: usize = 20;

/// Images larger than this are never downloaded.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 500_000;

/// Age after which a per-forum image directory is wiped.
pub const DEFAULT_IMAGE_EVICTION_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Per-request timeout for the underlying HTTP client.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Images shown for a thread that has an abstract.
pub const IMAGES_WITH_ABSTRACT: usize = 1;

/// Images shown for a thread without an abstract.
pub const IMAGES_WITHOUT_ABSTRACT: usize = 3;
