//! Article acquisition: extracted text, translated when needed, read aloud

use super::{Acquired, Pipeline, ProgressSink};
use crate::adapters::estimate_speech_secs;
use crate::error::ArticleError;
use crate::types::{Entry, ResourceId};
use crate::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

const TITLE_TAG: &str = "📖";

pub(super) async fn acquire(
    pipeline: &Pipeline,
    url: &str,
    id: &ResourceId,
    dest: &Path,
    progress: &dyn ProgressSink,
) -> Result<Acquired> {
    progress.note("Extracting article...").await;
    let article = pipeline.adapters.articles.extract(url).await?;
    if article.text_content.trim().is_empty() {
        return Err(ArticleError::NoContent.into());
    }
    tracing::info!(
        resource_id = %id,
        title = %article.title,
        chars = article.text_content.chars().count(),
        site = ?article.site_name,
        "Extracted article"
    );

    let title = if article.title.trim().is_empty() {
        "Article"
    } else {
        article.title.trim()
    };
    progress.note(&format!("Converting to audio: {title}")).await;
    let (path, duration_secs) =
        narrate(pipeline, &article.text_content, dest, progress).await?;

    let now = Utc::now();
    Ok(Acquired {
        entry: Entry {
            feed_name: pipeline.feed().to_string(),
            resource_id: id.clone(),
            title: format!("{TITLE_TAG} {title}"),
            link: url.to_string(),
            author_name: article.site_name.unwrap_or_default(),
            author_uri: url.to_string(),
            description: format!("TTS of article: {url}"),
            thumbnail_url: article.image.unwrap_or_default(),
            published: now,
            updated: now,
            file_path: path.to_string_lossy().into_owned(),
            duration_secs,
        },
        method: None,
    })
}

/// Translate `text` into the feed language if needed, synthesize it to
/// `dest` and report the audio length
///
/// The length comes from the probe, else from a reading-speed estimate of
/// the text that was actually spoken.
pub(super) async fn narrate(
    pipeline: &Pipeline,
    text: &str,
    dest: &Path,
    progress: &dyn ProgressSink,
) -> Result<(PathBuf, u64)> {
    let adapters = &pipeline.adapters;
    let target = pipeline.config.voiceover.target_lang.as_str();

    let detected = adapters.translator.detect_language(text);
    let spoken = if detected == target {
        text.to_string()
    } else {
        progress
            .note(&format!("Translating from {detected} to {target}..."))
            .await;
        let translated = adapters.translator.translate(text, target).await?;
        tracing::info!(from = %detected, to = target, chars = translated.chars().count(), "Translated text");
        translated
    };

    progress.note("Synthesizing speech...").await;
    let audio = adapters
        .tts
        .synthesize_chunked(&spoken, pipeline.config.tts.max_chunk_chars)
        .await?;
    if audio.is_empty() {
        return Err(Error::Synthesis("no audio produced".into()));
    }

    tokio::fs::write(dest, &audio)
        .await
        .map_err(|e| crate::error::io_at(dest, e))?;

    let probed = adapters.probe.probe(dest).await;
    let duration_secs = if probed > 0 {
        probed
    } else {
        estimate_speech_secs(&spoken)
    };

    tracing::debug!(path = %dest.display(), bytes = audio.len(), duration_secs, "Wrote synthesized audio");
    Ok((dest.to_path_buf(), duration_secs))
}
