//! Voiceover acquisition: the video's speech in the feed language
//!
//! Strategies in priority order:
//!
//! 1. an official dubbed track in the target language, downloaded as is
//! 2. for media longer than the long-media threshold, subtitles translated
//!    and read aloud
//! 3. otherwise the full-media voice translation tool
//!
//! A failed dubbed download falls through to whichever of 2 or 3 the
//! duration selects. Failures of 2 or 3 are final.

use super::article::narrate;
use super::{Acquired, Pipeline, ProgressSink};
use crate::adapters::parse_subtitle_file;
use crate::classify::watch_url;
use crate::fallback::run_in_order;
use crate::types::{DubbedTrack, Entry, Metadata, ResourceId, VoiceoverMethod};
use crate::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Strategy to use for a video, from track availability and duration alone
///
/// A track matching `target_lang` wins regardless of duration. Without one,
/// media strictly longer than `long_threshold` goes through subtitles and
/// everything else through the voice translation tool.
pub fn select_method(
    tracks: &[DubbedTrack],
    duration_secs: u64,
    target_lang: &str,
    long_threshold: Duration,
) -> VoiceoverMethod {
    if tracks.iter().any(|t| t.matches_language(target_lang)) {
        VoiceoverMethod::YoutubeDubbed
    } else {
        by_duration(duration_secs, long_threshold)
    }
}

/// Every strategy worth attempting, in order
///
/// The selected method first, followed by the duration-based fallback when
/// the selection is a dubbed track.
pub fn plan_methods(
    tracks: &[DubbedTrack],
    duration_secs: u64,
    target_lang: &str,
    long_threshold: Duration,
) -> Vec<VoiceoverMethod> {
    match select_method(tracks, duration_secs, target_lang, long_threshold) {
        VoiceoverMethod::YoutubeDubbed => vec![
            VoiceoverMethod::YoutubeDubbed,
            by_duration(duration_secs, long_threshold),
        ],
        method => vec![method],
    }
}

fn by_duration(duration_secs: u64, long_threshold: Duration) -> VoiceoverMethod {
    if duration_secs > long_threshold.as_secs() {
        VoiceoverMethod::SubtitlesTts
    } else {
        VoiceoverMethod::VotCli
    }
}

fn badge(method: VoiceoverMethod) -> &'static str {
    match method {
        VoiceoverMethod::YoutubeDubbed => "🎬",
        VoiceoverMethod::SubtitlesTts => "📝",
        VoiceoverMethod::VotCli => "🎙",
    }
}

struct Job<'a> {
    pipeline: &'a Pipeline,
    id: &'a ResourceId,
    url: &'a str,
    metadata: &'a Metadata,
    tracks: &'a [DubbedTrack],
    target: &'a str,
    dest: &'a Path,
    progress: &'a dyn ProgressSink,
}

pub(super) async fn acquire(
    pipeline: &Pipeline,
    submitted_url: &str,
    id: &ResourceId,
    dest: &Path,
    progress: &dyn ProgressSink,
) -> Result<Acquired> {
    let adapters = &pipeline.adapters;
    let settings = &pipeline.config.voiceover;
    let url = watch_url(id.raw());

    progress.note("Fetching video info...").await;
    let metadata = adapters.media.fetch_metadata(&url).await?;

    progress.note("Checking for dubbed audio tracks...").await;
    let tracks = match adapters.media.list_dubbed_tracks(&url).await {
        Ok(tracks) => tracks,
        Err(e) => {
            tracing::warn!(resource_id = %id, error = %e, "Could not list audio tracks, assuming none");
            Vec::new()
        }
    };

    let plan = plan_methods(
        &tracks,
        metadata.duration_secs,
        &settings.target_lang,
        settings.long_media_threshold,
    );
    tracing::info!(
        resource_id = %id,
        url = submitted_url,
        duration_secs = metadata.duration_secs,
        tracks = tracks.len(),
        plan = ?plan,
        "Planned voiceover"
    );

    let job = Job {
        pipeline,
        id,
        url: &url,
        metadata: &metadata,
        tracks: &tracks,
        target: &settings.target_lang,
        dest,
        progress,
    };
    let success = run_in_order(
        plan,
        |method| job.attempt(method),
        |method, _| *method == VoiceoverMethod::YoutubeDubbed,
    )
    .await
    .map_err(|e| e.into_error(|| Error::Other("no voiceover method available".into())))?;

    let method = success.candidate;
    let (path, duration_secs) = success.value;
    let now = Utc::now();
    let thumbnail_url = if metadata.thumbnail_url.is_empty() {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id.raw())
    } else {
        metadata.thumbnail_url.clone()
    };

    Ok(Acquired {
        entry: Entry {
            feed_name: pipeline.feed().to_string(),
            resource_id: id.clone(),
            title: format!("{} {} [{}]", badge(method), metadata.title, method.tag()),
            link: url.clone(),
            author_name: metadata.author,
            author_uri: metadata.author_url,
            description: format!(
                "Voiceover ({}): {}\n{}",
                method.tag(),
                metadata.title,
                metadata.description
            ),
            thumbnail_url,
            published: now,
            updated: now,
            file_path: path.to_string_lossy().into_owned(),
            duration_secs,
        },
        method: Some(method),
    })
}

impl Job<'_> {
    async fn attempt(&self, method: VoiceoverMethod) -> Result<(PathBuf, u64)> {
        let dest = self.dest;
        match method {
            VoiceoverMethod::YoutubeDubbed => {
                let track = self
                    .tracks
                    .iter()
                    .find(|t| t.matches_language(self.target))
                    .ok_or_else(|| Error::Other(format!("no {} track", self.target)))?;
                self.progress
                    .note(&format!("Downloading dubbed track ({})...", track.language))
                    .await;
                let path = self
                    .pipeline
                    .adapters
                    .media
                    .download_track(self.url, track, dest)
                    .await?;
                Ok((path.clone(), self.duration_of(&path).await))
            }
            VoiceoverMethod::SubtitlesTts => self.from_subtitles(dest).await,
            VoiceoverMethod::VotCli => {
                self.progress.note("Translating voice...").await;
                let path = self
                    .pipeline
                    .adapters
                    .voice
                    .translate_media(self.url, self.target, dest)
                    .await?;
                Ok((path.clone(), self.duration_of(&path).await))
            }
        }
    }

    async fn from_subtitles(&self, dest: &Path) -> Result<(PathBuf, u64)> {
        self.progress
            .note("Long video, using subtitles and speech synthesis...")
            .await;
        let stem = dest.with_file_name(format!("sub_{}", self.id.raw()));
        let subtitles = self
            .pipeline
            .adapters
            .media
            .download_subtitles(self.url, &stem)
            .await?;

        let transcript = parse_subtitle_file(&subtitles.path).await;
        if let Err(e) = tokio::fs::remove_file(&subtitles.path).await {
            tracing::debug!(path = %subtitles.path.display(), error = %e, "Could not remove subtitle file");
        }
        let transcript = transcript?;
        if transcript.trim().is_empty() {
            return Err(Error::Other("subtitles contain no text".into()));
        }
        tracing::info!(
            resource_id = %self.id,
            language = %subtitles.language,
            chars = transcript.chars().count(),
            "Parsed subtitles"
        );

        narrate(self.pipeline, &transcript, dest, self.progress).await
    }

    async fn duration_of(&self, path: &std::path::Path) -> u64 {
        match self.pipeline.adapters.probe.probe(path).await {
            0 => self.metadata.duration_secs,
            secs => secs,
        }
    }
}
