//! External collaborators used by the pipelines
//!
//! Every collaborator sits behind a narrow trait so pipelines can treat it as
//! a black box that may fail or take long:
//!
//! - [`MediaSource`]: metadata, audio, dubbed tracks and subtitles ([`YtDlp`])
//! - [`VoiceTranslator`]: full-media voice translation ([`VotCli`])
//! - [`DurationProbe`]: audio length ([`FfProbe`])
//! - [`SpeechSynthesizer`]: text to speech ([`EdgeTts`])
//! - [`ArticleExtractor`]: readable text from a web page ([`ReaderExtractor`])
//! - [`Translator`]: text translation across mirrors ([`MirrorTranslator`])
//!
//! When a binary cannot be found the matching `NoOp*` stand-in is used and
//! calls fail with [`crate::Error::NotSupported`].
//!
//! ## Usage
//!
//! ```no_run
//! use audiofeed::adapters::Adapters;
//! use audiofeed::Config;
//!
//! # fn main() -> audiofeed::Result<()> {
//! let adapters = Adapters::from_config(&Config::default())?;
//! println!("media source: {}", adapters.media.name());
//! # Ok(())
//! # }
//! ```

mod article;
mod edge_tts;
mod ffprobe;
mod noop;
pub(crate) mod process;
mod subtitles;
mod text;
mod traits;
mod translate;
mod votcli;
mod ytdlp;

pub use article::ReaderExtractor;
pub use edge_tts::EdgeTts;
pub use ffprobe::FfProbe;
pub use noop::{
    NoOpArticleExtractor, NoOpDurationProbe, NoOpMediaSource, NoOpSpeechSynthesizer,
    NoOpVoiceTranslator,
};
pub use subtitles::{parse_srt, parse_subtitle_file, parse_vtt};
pub use text::{detect_language, estimate_speech_secs, split_paragraphs, split_sentences};
pub use traits::{
    ArticleExtractor, DurationProbe, MediaSource, SpeechSynthesizer, SubtitleFile,
    TranslationBackend, Translator, VoiceTranslator,
};
pub use translate::{LibreTranslateBackend, MirrorTranslator, YandexBackend};
pub use votcli::VotCli;
pub use ytdlp::YtDlp;

use crate::Config;
use process::resolve_binary;
use std::sync::Arc;

/// The set of collaborators a pipeline run needs
///
/// Built once at startup and shared; nothing in it changes afterwards.
#[derive(Clone)]
pub struct Adapters {
    /// Video host access
    pub media: Arc<dyn MediaSource>,
    /// Full-media voice translation
    pub voice: Arc<dyn VoiceTranslator>,
    /// Audio length probing
    pub probe: Arc<dyn DurationProbe>,
    /// Text to speech
    pub tts: Arc<dyn SpeechSynthesizer>,
    /// Article text extraction
    pub articles: Arc<dyn ArticleExtractor>,
    /// Text translation
    pub translator: Arc<dyn Translator>,
}

impl Adapters {
    /// Pick an implementation for every collaborator from configuration
    ///
    /// Each binary comes from its explicit path, else from PATH when
    /// `tools.search_path` is set, else its no-op stand-in is used.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let tools = &config.tools;
        let timeouts = &config.timeouts;

        let media: Arc<dyn MediaSource> =
            match resolve_binary(tools.yt_dlp_path.as_ref(), "yt-dlp", tools.search_path) {
                Some(binary) => Arc::new(YtDlp::new(
                    binary,
                    tools.cookies_file.clone(),
                    timeouts.clone(),
                )),
                None => Arc::new(NoOpMediaSource),
            };

        let voice: Arc<dyn VoiceTranslator> =
            match resolve_binary(tools.vot_cli_path.as_ref(), "vot-cli", tools.search_path) {
                Some(binary) => Arc::new(VotCli::new(binary, timeouts.voice_translation)),
                None => Arc::new(NoOpVoiceTranslator),
            };

        let probe: Arc<dyn DurationProbe> =
            match resolve_binary(tools.ffprobe_path.as_ref(), "ffprobe", tools.search_path) {
                Some(binary) => Arc::new(FfProbe::new(binary, timeouts.probe)),
                None => Arc::new(NoOpDurationProbe),
            };

        let tts: Arc<dyn SpeechSynthesizer> =
            match resolve_binary(tools.edge_tts_path.as_ref(), "edge-tts", tools.search_path) {
                Some(binary) => Arc::new(EdgeTts::new(
                    binary,
                    config.tts.voice.clone(),
                    config.feed.files_location.clone(),
                    config.tts.chunk_delay,
                    timeouts.synthesis,
                )),
                None => Arc::new(NoOpSpeechSynthesizer),
            };

        let articles: Arc<dyn ArticleExtractor> = if config.article.enabled {
            Arc::new(ReaderExtractor::new(
                config.article.reader_url.clone(),
                config.article.api_key.clone(),
                timeouts.http,
            ))
        } else {
            Arc::new(NoOpArticleExtractor)
        };

        let translator: Arc<dyn Translator> =
            Arc::new(MirrorTranslator::from_config(&config.translation, timeouts.http)?);

        tracing::info!(
            media = media.name(),
            voice = voice.name(),
            tts = tts.name(),
            articles = config.article.enabled,
            mirrors = config.translation.mirrors.len(),
            "Adapters initialized"
        );

        Ok(Self {
            media,
            voice,
            probe,
            tts,
            articles,
            translator,
        })
    }
}
