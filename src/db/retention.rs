//! Retention eviction.

use crate::Result;

use super::{Database, query_failed};

impl Database {
    /// Delete the oldest entries beyond the newest `max_items` of a feed
    ///
    /// Returns exactly the file paths of the deleted rows. Selection and
    /// deletion are one statement, which takes the write lock before reading,
    /// so a concurrent `save` makes it wait instead of failing. Deleting the
    /// files is left to the caller.
    pub async fn remove_old(&self, feed: &str, max_items: usize) -> Result<Vec<String>> {
        // LIMIT -1 means "no limit" in SQLite
        let removed: Vec<String> = sqlx::query_scalar(
            r#"
            DELETE FROM entries
            WHERE id IN (
                SELECT id FROM entries
                WHERE feed_name = ?
                ORDER BY published DESC, id DESC
                LIMIT -1 OFFSET ?
            )
            RETURNING file_path
            "#,
        )
        .bind(feed)
        .bind(i64::try_from(max_items).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("delete excess entries", e))?;

        if !removed.is_empty() {
            tracing::info!(feed, max_items, removed = removed.len(), "Evicted old entries");
        }
        Ok(removed)
    }
}
