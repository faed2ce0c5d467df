//! Tieba feed library.
//!
//! Fetches the thread list of a forum page, extracts thread records from its
//! markup, prefetches a bounded set of preview images per thread, and caches
//! the result so a periodically invoked home-screen widget never waits on the
//! network longer than a fixed deadline.

// Allow raw string hashes for safety - they're harmless and prevent issues if markup changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod cache;
pub mod config;
pub mod constants;
pub mod deadline;
pub mod error;
pub mod extractor;
pub mod fs_utils;
pub mod images;
pub mod models;
pub mod pipeline;

pub use config::Config;
pub use error::PipelineError;
pub use models::{CacheRecord, Entry, Post};
pub use pipeline::Pipeline;
