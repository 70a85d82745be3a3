use crate::db::Database;
use crate::types::{Entry, ResourceId, ResourceKind};
use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;

mod retention;

/// Open a fresh database backed by a temp file
///
/// The temp file handle is returned so it outlives the pool.
pub(super) async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

/// Build an entry published `published_secs` after the epoch
pub(super) fn entry(feed: &str, kind: ResourceKind, raw: &str, published_secs: i64) -> Entry {
    let published = Utc.timestamp_opt(published_secs, 0).single().unwrap();
    Entry {
        feed_name: feed.to_string(),
        resource_id: ResourceId::new(kind, raw),
        title: format!("Title {raw}"),
        link: format!("https://www.youtube.com/watch?v={raw}"),
        author_name: "Channel".to_string(),
        author_uri: "https://www.youtube.com/@channel".to_string(),
        description: "desc".to_string(),
        thumbnail_url: String::new(),
        published,
        updated: published,
        file_path: format!("/audio/{raw}.mp3"),
        duration_secs: 60,
    }
}

pub(super) fn video(feed: &str, raw: &str, published_secs: i64) -> Entry {
    entry(feed, ResourceKind::Video, raw, published_secs)
}
