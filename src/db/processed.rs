//! Processed-marker ledger.
//!
//! Markers record that a resource was ingested at some point. They are
//! independent of entry existence, so deleting an entry does not make its
//! resource eligible for re-download unless the marker is reset as well.

use crate::Result;
use crate::types::{Entry, ResourceId};
use chrono::{DateTime, TimeZone, Utc};

use super::{Database, query_failed};

impl Database {
    /// Record the entry's resource as processed (idempotent)
    pub async fn set_processed(&self, entry: &Entry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO processed (feed_name, resource_id, processed_at)
            VALUES (?, ?, ?)
            ON CONFLICT(feed_name, resource_id) DO NOTHING
            "#,
        )
        .bind(&entry.feed_name)
        .bind(&entry.resource_id)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("set processed marker", e))?;
        Ok(())
    }

    /// When the entry's resource was marked processed, if ever
    pub async fn check_processed(&self, entry: &Entry) -> Result<Option<DateTime<Utc>>> {
        self.processed_at(&entry.feed_name, &entry.resource_id).await
    }

    /// Marker lookup by key, for callers that have no entry yet
    pub async fn processed_at(
        &self,
        feed: &str,
        resource_id: &ResourceId,
    ) -> Result<Option<DateTime<Utc>>> {
        let processed_at: Option<i64> = sqlx::query_scalar(
            "SELECT processed_at FROM processed WHERE feed_name = ? AND resource_id = ?",
        )
        .bind(feed)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("check processed marker", e))?;

        Ok(processed_at.and_then(|ts| Utc.timestamp_opt(ts, 0).single()))
    }

    /// Whether the entry's resource has a processed marker
    pub async fn is_processed(&self, entry: &Entry) -> Result<bool> {
        Ok(self.check_processed(entry).await?.is_some())
    }

    /// Drop the processed marker so the resource can be ingested again
    pub async fn reset_processed(&self, entry: &Entry) -> Result<()> {
        sqlx::query("DELETE FROM processed WHERE feed_name = ? AND resource_id = ?")
            .bind(&entry.feed_name)
            .bind(&entry.resource_id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("reset processed marker", e))?;
        Ok(())
    }
}
