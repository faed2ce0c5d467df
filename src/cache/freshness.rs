use chrono::{DateTime, Utc};

use crate::models::CacheRecord;

/// Whether `record` can be served without refetching.
///
/// A record is fresh while `now - fetched_at` is strictly below the refresh
/// interval. A missing record is never fresh.
#[must_use]
pub fn is_fresh(
    record: Option<&CacheRecord>,
    now: DateTime<Utc>,
    refresh_interval_minutes: u64,
) -> bool {
    let Some(record) = record else {
        return false;
    };
    let interval_ms = i64::try_from(refresh_interval_minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(60_000);
    let elapsed_ms = now
        .signed_duration_since(record.fetched_at)
        .num_milliseconds();
    elapsed_ms < interval_ms
}
