//! Cache storage and freshness policy.
//!
//! Stores treat each key as an atomic get/set cell; there is no
//! read-modify-write transaction. Two concurrent invocations for the same key
//! may lose an update, which the next invocation repairs.

pub mod file_store;
pub mod freshness;
pub mod memory;

pub use file_store::FileCacheStore;
pub use freshness::is_fresh;
pub use memory::MemoryCacheStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CacheRecord;

/// Key/value store for [`CacheRecord`]s, keyed by forum name.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Load the record for `key`, or `None` if nothing was stored.
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>>;

    /// Replace the record for `key`. Readers see either the old or the new
    /// record, never a mix.
    async fn set(&self, key: &str, record: &CacheRecord) -> Result<()>;
}
