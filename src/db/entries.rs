//! Entry load/save/remove.

use crate::Result;
use crate::types::{Entry, ResourceId};

use super::{Database, EntryRow, query_failed};

const ENTRY_COLUMNS: &str = r#"
    id, feed_name, resource_id, title, link, author_name, author_uri,
    description, thumbnail_url, published, updated, file_path, duration_secs
"#;

impl Database {
    /// Load up to `limit` entries of a feed, newest first
    ///
    /// Ordered by `published` descending; entries published at the same
    /// instant come back newest insertion first. An empty feed yields an
    /// empty vector.
    pub async fn load(&self, feed: &str, limit: usize) -> Result<Vec<Entry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE feed_name = ? ORDER BY published DESC, id DESC LIMIT ?"
        ))
        .bind(feed)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("load entries", e))?;

        rows.into_iter().map(Entry::try_from).collect()
    }

    /// Insert an entry unless its `(feed_name, resource_id)` already exists
    ///
    /// Returns `true` when a row was created. An existing entry is left
    /// untouched, metadata included; `false` is the signal that another
    /// pipeline got there first.
    pub async fn save(&self, entry: &Entry) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO entries (
                feed_name, resource_id, title, link, author_name, author_uri,
                description, thumbnail_url, published, updated, file_path,
                duration_secs, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(feed_name, resource_id) DO NOTHING
            "#,
        )
        .bind(&entry.feed_name)
        .bind(&entry.resource_id)
        .bind(&entry.title)
        .bind(&entry.link)
        .bind(&entry.author_name)
        .bind(&entry.author_uri)
        .bind(&entry.description)
        .bind(&entry.thumbnail_url)
        .bind(entry.published.timestamp())
        .bind(entry.updated.timestamp())
        .bind(&entry.file_path)
        .bind(i64::try_from(entry.duration_secs).unwrap_or(i64::MAX))
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("save entry", e))?;

        let created = result.rows_affected() == 1;
        tracing::debug!(
            feed = %entry.feed_name,
            resource_id = %entry.resource_id,
            created,
            "Saved entry"
        );
        Ok(created)
    }

    /// Delete an entry row; its processed marker is left in place
    pub async fn remove(&self, entry: &Entry) -> Result<()> {
        sqlx::query("DELETE FROM entries WHERE feed_name = ? AND resource_id = ?")
            .bind(&entry.feed_name)
            .bind(&entry.resource_id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("remove entry", e))?;
        Ok(())
    }

    /// Look up a single entry
    pub async fn get(&self, feed: &str, resource_id: &ResourceId) -> Result<Option<Entry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE feed_name = ? AND resource_id = ?"
        ))
        .bind(feed)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("get entry", e))?;

        row.map(Entry::try_from).transpose()
    }

    /// Number of live entries in a feed
    pub async fn count(&self, feed: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE feed_name = ?")
            .bind(feed)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_failed("count entries", e))?;
        Ok(count.max(0) as usize)
    }
}
