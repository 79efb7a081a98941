//! Small shared Redis helpers.

use anyhow::Result;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Collect all keys matching `pattern` via SCAN.
///
/// Keys are buffered before the caller mutates anything so the cursor is
/// never invalidated mid-iteration.
pub async fn scan_keys(redis: &mut ConnectionManager, pattern: &str) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut iter: redis::AsyncIter<'_, String> = redis.scan_match(pattern).await?;
    while let Some(key) = iter.next_item().await {
        keys.push(key);
    }
    Ok(keys)
}
