//! Configuration types for audiofeed

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Feed settings (name, retention bound, audio file location)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Logical feed name, the first half of every dedup key (default: "personal")
    #[serde(default = "default_feed_name")]
    pub feed_name: String,

    /// Human-readable feed title shown in help output
    #[serde(default = "default_feed_title")]
    pub feed_title: String,

    /// Retention bound; 0 disables eviction (default: 50)
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Directory that receives audio files (default: "./audio")
    #[serde(default = "default_files_location")]
    pub files_location: PathBuf,

    /// Public base URL of the feed server, used in help output
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_name: default_feed_name(),
            feed_title: default_feed_title(),
            max_items: default_max_items(),
            files_location: default_files_location(),
            base_url: None,
        }
    }
}

/// External tool paths and credentials
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Path to vot-cli executable (auto-detected if None)
    #[serde(default)]
    pub vot_cli_path: Option<PathBuf>,

    /// Path to ffprobe executable (auto-detected if None)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Path to edge-tts executable (auto-detected if None)
    #[serde(default)]
    pub edge_tts_path: Option<PathBuf>,

    /// Cookies file handed to yt-dlp; enables the credential-expiry retry
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            vot_cli_path: None,
            ffprobe_path: None,
            edge_tts_path: None,
            cookies_file: None,
            search_path: true,
        }
    }
}

/// Wall-clock ceilings for individual external invocations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Metadata and track listing (default: 2 minutes)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    pub metadata: Duration,

    /// Media and dubbed track downloads (default: 30 minutes)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download: Duration,

    /// Subtitle downloads (default: 5 minutes)
    #[serde(default = "default_subtitles_timeout", with = "duration_serde")]
    pub subtitles: Duration,

    /// Full-media voice translation (default: 30 minutes)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub voice_translation: Duration,

    /// One speech synthesis request (default: 2 minutes)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    pub synthesis: Duration,

    /// Duration probing (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub probe: Duration,

    /// HTTP requests to article and translation services (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub http: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            metadata: default_metadata_timeout(),
            download: default_download_timeout(),
            subtitles: default_subtitles_timeout(),
            voice_translation: default_download_timeout(),
            synthesis: default_metadata_timeout(),
            probe: default_http_timeout(),
            http: default_http_timeout(),
        }
    }
}

/// Which wire protocol a translation mirror speaks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationBackendKind {
    /// Yandex Cloud Translate v2 (`Api-Key` auth, folder id required)
    Yandex,
    /// LibreTranslate-compatible `/translate` endpoint
    LibreTranslate,
}

/// One translation backend mirror, tried in declared order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationMirror {
    /// Protocol spoken by this mirror
    pub kind: TranslationBackendKind,

    /// Endpoint URL
    pub url: String,

    /// API key, if the mirror needs one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Yandex folder id
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Translation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Backend mirrors in priority order (empty = translation unavailable)
    #[serde(default)]
    pub mirrors: Vec<TranslationMirror>,

    /// Maximum characters per translation request (default: 5000)
    #[serde(default = "default_translation_chunk")]
    pub max_chunk_chars: usize,

    /// Delay between chunk requests (default: 500 ms)
    #[serde(default = "default_translation_delay", with = "millis_serde")]
    pub chunk_delay: Duration,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            mirrors: Vec::new(),
            max_chunk_chars: default_translation_chunk(),
            chunk_delay: default_translation_delay(),
        }
    }
}

/// Speech synthesis settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Voice name (default: "ru-RU-DmitryNeural")
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Maximum characters per synthesis request (default: 3000)
    #[serde(default = "default_tts_chunk")]
    pub max_chunk_chars: usize,

    /// Delay between chunk requests (default: 100 ms)
    #[serde(default = "default_tts_delay", with = "millis_serde")]
    pub chunk_delay: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            max_chunk_chars: default_tts_chunk(),
            chunk_delay: default_tts_delay(),
        }
    }
}

/// Article reader service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArticleConfig {
    /// Whether article links are accepted at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Reader service base URL (default: "https://r.jina.ai")
    #[serde(default = "default_reader_url")]
    pub reader_url: String,

    /// Optional reader service API key
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reader_url: default_reader_url(),
            api_key: None,
        }
    }
}

/// Voiceover cascade settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoiceoverConfig {
    /// Target language for dubbing and translation (default: "ru")
    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// Media longer than this goes through subtitles + TTS (default: 4 hours)
    #[serde(default = "default_long_media", with = "duration_serde")]
    pub long_media_threshold: Duration,
}

impl Default for VoiceoverConfig {
    fn default() -> Self {
        Self {
            target_lang: default_target_lang(),
            long_media_threshold: default_long_media(),
        }
    }
}

/// Command surface settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// The single principal allowed to issue commands
    pub allowed_principal: i64,

    /// Delay before the source message is removed (default: 5 seconds)
    #[serde(default = "default_cleanup_delay", with = "duration_serde")]
    pub cleanup_delay: Duration,

    /// Entries shown by `/list` (default: 10)
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            allowed_principal: 0,
            cleanup_delay: default_cleanup_delay(),
            list_limit: default_list_limit(),
        }
    }
}

/// Telegram Bot API transport settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token
    pub token: String,

    /// API base URL (default: "https://api.telegram.org")
    #[serde(default = "default_telegram_url")]
    pub api_url: String,

    /// Long-poll timeout (default: 30 seconds)
    #[serde(default = "default_poll_timeout", with = "duration_serde")]
    pub poll_timeout: Duration,
}

/// Data storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "audiofeed.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration
///
/// Fields are organized into logical sub-configs. Everything except
/// `dispatcher.allowed_principal` has a working default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed name, retention and file location
    #[serde(default)]
    pub feed: FeedConfig,

    /// External binaries and credentials
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Per-invocation wall-clock ceilings
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Translation mirrors and chunking
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Speech synthesis
    #[serde(default)]
    pub tts: TtsConfig,

    /// Article extraction
    #[serde(default)]
    pub article: ArticleConfig,

    /// Voiceover cascade
    #[serde(default)]
    pub voiceover: VoiceoverConfig,

    /// Command surface
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Bot transport (None when the embedding application brings its own)
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.feed.feed_name.trim().is_empty() {
            return Err(Error::config("feed.feed_name", "feed name must not be empty"));
        }
        if self.dispatcher.allowed_principal == 0 {
            return Err(Error::config(
                "dispatcher.allowed_principal",
                "an allowed principal id is required",
            ));
        }
        if self.translation.max_chunk_chars == 0 {
            return Err(Error::config(
                "translation.max_chunk_chars",
                "chunk size must be positive",
            ));
        }
        if self.tts.max_chunk_chars == 0 {
            return Err(Error::config(
                "tts.max_chunk_chars",
                "chunk size must be positive",
            ));
        }
        for (idx, mirror) in self.translation.mirrors.iter().enumerate() {
            if url::Url::parse(&mirror.url).is_err() {
                return Err(Error::config(
                    &format!("translation.mirrors[{idx}].url"),
                    format!("invalid URL: {}", mirror.url),
                ));
            }
            if mirror.kind == TranslationBackendKind::Yandex
                && (mirror.api_key.is_none() || mirror.folder_id.is_none())
            {
                return Err(Error::config(
                    &format!("translation.mirrors[{idx}]"),
                    "yandex mirrors need api_key and folder_id",
                ));
            }
        }
        if let Some(telegram) = &self.telegram
            && telegram.token.is_empty()
        {
            return Err(Error::config("telegram.token", "bot token required"));
        }
        Ok(())
    }
}

// Default value functions
fn default_feed_name() -> String {
    "personal".into()
}

fn default_feed_title() -> String {
    "Personal audio feed".into()
}

fn default_max_items() -> usize {
    50
}

fn default_files_location() -> PathBuf {
    PathBuf::from("audio")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("audiofeed.db")
}

fn default_true() -> bool {
    true
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(2 * 60)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_subtitles_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_translation_chunk() -> usize {
    5000
}

fn default_translation_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_voice() -> String {
    "ru-RU-DmitryNeural".into()
}

fn default_tts_chunk() -> usize {
    3000
}

fn default_tts_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_reader_url() -> String {
    "https://r.jina.ai".into()
}

fn default_target_lang() -> String {
    "ru".into()
}

fn default_long_media() -> Duration {
    Duration::from_secs(4 * 60 * 60)
}

fn default_cleanup_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_list_limit() -> usize {
    10
}

fn default_telegram_url() -> String {
    "https://api.telegram.org".into()
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(30)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
