//! Entry store for audiofeed
//!
//! Handles SQLite persistence for feed entries and the processed-marker ledger.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`entries`]: Entry load/save/remove
//! - [`processed`]: Processed-marker ledger, independent of entry existence
//! - [`retention`]: Oldest-first eviction beyond a retention bound
//!
//! Both key spaces are keyed by `(feed_name, resource_id)`. Saving is a single
//! `INSERT ... ON CONFLICT DO NOTHING`, which is the only synchronization
//! point concurrent pipelines rely on.

use crate::error::DatabaseError;
use crate::types::{Entry, ResourceId};
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod entries;
mod migrations;
mod processed;
mod retention;

/// Entry record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct EntryRow {
    /// Insertion sequence, used to break `published` ties
    pub id: i64,
    /// Feed name
    pub feed_name: String,
    /// Namespaced resource id
    pub resource_id: String,
    /// Display title
    pub title: String,
    /// Source link
    pub link: String,
    /// Author name
    pub author_name: String,
    /// Author link
    pub author_uri: String,
    /// Description
    pub description: String,
    /// Thumbnail URL
    pub thumbnail_url: String,
    /// Unix timestamp of publication
    pub published: i64,
    /// Unix timestamp of last update
    pub updated: i64,
    /// Audio file path
    pub file_path: String,
    /// Audio length in seconds
    pub duration_secs: i64,
}

impl TryFrom<EntryRow> for Entry {
    type Error = Error;

    fn try_from(row: EntryRow) -> Result<Self> {
        let resource_id: ResourceId = row.resource_id.parse().map_err(|e: String| {
            Error::Database(DatabaseError::CorruptRow(format!("entry {}: {}", row.id, e)))
        })?;

        Ok(Entry {
            feed_name: row.feed_name,
            resource_id,
            title: row.title,
            link: row.link,
            author_name: row.author_name,
            author_uri: row.author_uri,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            published: from_timestamp(row.published),
            updated: from_timestamp(row.updated),
            file_path: row.file_path,
            duration_secs: row.duration_secs.max(0) as u64,
        })
    }
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

/// Map a sqlx failure to a store error naming the operation
pub(crate) fn query_failed(operation: &str, e: sqlx::Error) -> Error {
    Error::Database(DatabaseError::QueryFailed(format!(
        "Failed to {}: {}",
        operation, e
    )))
}

/// Database handle for audiofeed
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
