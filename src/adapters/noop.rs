//! Stand-ins used when a tool binary or service is unavailable
//!
//! Each returns [`Error::NotSupported`] naming the missing piece, so a
//! submission that needs it fails with an actionable message while the rest
//! of the system keeps working.

use super::traits::{
    ArticleExtractor, DurationProbe, MediaSource, SpeechSynthesizer, SubtitleFile, VoiceTranslator,
};
use crate::types::{ArticleContent, DubbedTrack, Metadata};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

fn missing(what: &str, setting: &str) -> Error {
    Error::NotSupported(format!(
        "{what} requires an external binary. Configure tools.{setting} or ensure it is in PATH."
    ))
}

/// Media source used when yt-dlp is not available
pub struct NoOpMediaSource;

#[async_trait]
impl MediaSource for NoOpMediaSource {
    async fn fetch_metadata(&self, _url: &str) -> Result<Metadata> {
        Err(missing("Video metadata", "yt_dlp_path"))
    }

    async fn acquire_media(&self, _id: &str, _dest: &Path) -> Result<PathBuf> {
        Err(missing("Video download", "yt_dlp_path"))
    }

    async fn list_dubbed_tracks(&self, _url: &str) -> Result<Vec<DubbedTrack>> {
        Err(missing("Audio track listing", "yt_dlp_path"))
    }

    async fn download_track(&self, _url: &str, _track: &DubbedTrack, _dest: &Path) -> Result<PathBuf> {
        Err(missing("Audio track download", "yt_dlp_path"))
    }

    async fn download_subtitles(&self, _url: &str, _stem: &Path) -> Result<SubtitleFile> {
        Err(missing("Subtitle download", "yt_dlp_path"))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Voice translator used when vot-cli is not available
pub struct NoOpVoiceTranslator;

#[async_trait]
impl VoiceTranslator for NoOpVoiceTranslator {
    async fn translate_media(&self, _url: &str, _target_lang: &str, _dest: &Path) -> Result<PathBuf> {
        Err(missing("Voice translation", "vot_cli_path"))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Synthesizer used when edge-tts is not available
pub struct NoOpSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NoOpSpeechSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Err(missing("Speech synthesis", "edge_tts_path"))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Probe used when ffprobe is not available; every duration is unknown
pub struct NoOpDurationProbe;

#[async_trait]
impl DurationProbe for NoOpDurationProbe {
    async fn probe(&self, _path: &Path) -> u64 {
        0
    }
}

/// Extractor used when article support is disabled
pub struct NoOpArticleExtractor;

#[async_trait]
impl ArticleExtractor for NoOpArticleExtractor {
    async fn extract(&self, _url: &str) -> Result<ArticleContent> {
        Err(Error::NotSupported(
            "Article extraction is disabled. Set article.enabled in config.".into(),
        ))
    }
}
