//! Collaborator traits consumed by the pipelines
//!
//! Pipelines treat every implementation as a black box that may fail or
//! take long. Implementations are constructed once at startup and shared
//! behind `Arc<dyn Trait>`.

use crate::Result;
use crate::types::{ArticleContent, DubbedTrack, Metadata};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A subtitle file fetched for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleFile {
    /// Where the file was written
    pub path: PathBuf,
    /// Language of the subtitles (`en`, `ru`)
    pub language: String,
}

/// Video host access: metadata, audio, dubbed tracks and subtitles
///
/// Implementations that use stored credentials apply the credential-expiry
/// retry to every call.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetch display metadata for a video URL
    async fn fetch_metadata(&self, url: &str) -> Result<Metadata>;

    /// Download the original audio of video `id` to `dest`
    ///
    /// # Errors
    ///
    /// [`crate::Error::Skip`] when the tool ran but produced no file.
    async fn acquire_media(&self, id: &str, dest: &Path) -> Result<PathBuf>;

    /// List official dubbed audio tracks, one per language
    async fn list_dubbed_tracks(&self, url: &str) -> Result<Vec<DubbedTrack>>;

    /// Download one dubbed track to `dest`
    async fn download_track(&self, url: &str, track: &DubbedTrack, dest: &Path) -> Result<PathBuf>;

    /// Download subtitles into files named after `stem`
    async fn download_subtitles(&self, url: &str, stem: &Path) -> Result<SubtitleFile>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Full-media voice translation
#[async_trait]
pub trait VoiceTranslator: Send + Sync {
    /// Produce a translated voiceover of `url` in `target_lang` at `dest`
    async fn translate_media(&self, url: &str, target_lang: &str, dest: &Path) -> Result<PathBuf>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Audio length probing
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Length of the audio file in seconds, 0 when unknown
    async fn probe(&self, path: &Path) -> u64;
}

/// Text-to-speech
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one request worth of text
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Pause between chunk requests of [`SpeechSynthesizer::synthesize_chunked`]
    fn chunk_delay(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// Synthesize long text by splitting it at sentence boundaries
    ///
    /// Chunks are synthesized sequentially and their audio concatenated in order.
    async fn synthesize_chunked(&self, text: &str, max_chunk_chars: usize) -> Result<Vec<u8>> {
        let chunks = super::split_sentences(text, max_chunk_chars);
        let total = chunks.len();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.chunk_delay()).await;
            }
            tracing::debug!(chunk = idx + 1, total, chars = chunk.chars().count(), "Synthesizing chunk");
            audio.extend(self.synthesize(chunk).await?);
        }

        Ok(audio)
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Readable-text extraction from web pages
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    /// Fetch and extract an article
    ///
    /// # Errors
    ///
    /// [`crate::error::ArticleError`] variants wrapped in [`crate::Error::Article`].
    async fn extract(&self, url: &str) -> Result<ArticleContent>;
}

/// Text translation
#[async_trait]
pub trait Translator: Send + Sync {
    /// Cheap language guess (`ru` or `en`)
    fn detect_language(&self, text: &str) -> String {
        super::detect_language(text).to_string()
    }

    /// Translate `text` into `target_lang`
    ///
    /// Text already in the target language is returned unchanged.
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

/// One translation service endpoint
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate a single chunk that fits within the service's size limit
    async fn translate_chunk(&self, text: &str, target_lang: &str) -> Result<String>;

    /// Endpoint description for logging
    fn name(&self) -> &str;
}
