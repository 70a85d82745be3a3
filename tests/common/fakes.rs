//! In-process adapters and a feed builder over a temp directory

use async_trait::async_trait;
use audiofeed::adapters::{
    Adapters, DurationProbe, MediaSource, NoOpArticleExtractor, NoOpSpeechSynthesizer,
    NoOpVoiceTranslator, SubtitleFile, Translator,
};
use audiofeed::types::{DubbedTrack, Metadata};
use audiofeed::{AudioFeed, Config, Database, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Video host that writes a small file per download, optionally slowly
pub struct SlowMedia {
    pub delay: Duration,
    pub downloads: AtomicUsize,
}

impl SlowMedia {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            downloads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaSource for SlowMedia {
    async fn fetch_metadata(&self, url: &str) -> Result<Metadata> {
        let id = audiofeed::classify::extract_video_id(url)
            .ok_or_else(|| Error::InvalidInput(url.to_string()))?;
        Ok(Metadata {
            title: format!("Video {id}"),
            duration_secs: 120,
            source_url: url.to_string(),
            id,
            ..Default::default()
        })
    }

    async fn acquire_media(&self, id: &str, dest: &Path) -> Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        tokio::fs::write(dest, id.as_bytes()).await?;
        Ok(dest.to_path_buf())
    }

    async fn list_dubbed_tracks(&self, _url: &str) -> Result<Vec<DubbedTrack>> {
        Ok(Vec::new())
    }

    async fn download_track(&self, _url: &str, _track: &DubbedTrack, _dest: &Path) -> Result<PathBuf> {
        Err(Error::NotSupported("no dubbed tracks".into()))
    }

    async fn download_subtitles(&self, _url: &str, _stem: &Path) -> Result<SubtitleFile> {
        Err(Error::NotSupported("no subtitles".into()))
    }

    fn name(&self) -> &'static str {
        "slow-fake"
    }
}

/// Probe that trusts metadata
pub struct UnknownDuration;

#[async_trait]
impl DurationProbe for UnknownDuration {
    async fn probe(&self, _path: &Path) -> u64 {
        0
    }
}

/// Translator that never needs to run
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(&self, text: &str, _target_lang: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Feed named `e2e` over a temp directory with `media` as its video host
pub async fn feed_with(media: Arc<SlowMedia>, max_items: usize) -> (AudioFeed, TempDir) {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.feed.feed_name = "e2e".into();
    config.feed.max_items = max_items;
    config.feed.files_location = dir.path().join("audio");
    config.persistence.database_path = dir.path().join("feed.db");

    let adapters = Adapters {
        media,
        voice: Arc::new(NoOpVoiceTranslator),
        probe: Arc::new(UnknownDuration),
        tts: Arc::new(NoOpSpeechSynthesizer),
        articles: Arc::new(NoOpArticleExtractor),
        translator: Arc::new(IdentityTranslator),
    };
    let db = Arc::new(Database::new(&config.persistence.database_path).await.unwrap());
    (AudioFeed::with_parts(db, adapters, config), dir)
}
