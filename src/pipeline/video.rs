//! Video acquisition: the source's original audio track

use super::{Acquired, Pipeline, ProgressSink};
use crate::Result;
use crate::classify::watch_url;
use crate::types::{Entry, ResourceId};
use chrono::Utc;
use std::path::Path;

pub(super) async fn acquire(
    pipeline: &Pipeline,
    id: &ResourceId,
    dest: &Path,
    progress: &dyn ProgressSink,
) -> Result<Acquired> {
    let media = &pipeline.adapters.media;
    let url = watch_url(id.raw());

    progress.note("Fetching video info...").await;
    let metadata = media.fetch_metadata(&url).await?;
    tracing::info!(resource_id = %id, title = %metadata.title, duration_secs = metadata.duration_secs, "Fetched metadata");

    progress
        .note(&format!("Downloading audio: {}", metadata.title))
        .await;
    let path = media.acquire_media(id.raw(), dest).await?;

    let probed = pipeline.adapters.probe.probe(&path).await;
    let duration_secs = if probed > 0 {
        probed
    } else {
        metadata.duration_secs
    };

    let now = Utc::now();
    let link = if metadata.source_url.is_empty() {
        url
    } else {
        metadata.source_url.clone()
    };

    Ok(Acquired {
        entry: Entry {
            feed_name: pipeline.feed().to_string(),
            resource_id: id.clone(),
            published: metadata.published().unwrap_or(now),
            updated: now,
            title: metadata.title,
            link,
            author_name: metadata.author,
            author_uri: metadata.author_url,
            description: metadata.description,
            thumbnail_url: metadata.thumbnail_url,
            file_path: path.to_string_lossy().into_owned(),
            duration_secs,
        },
        method: None,
    })
}
