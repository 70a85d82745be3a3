//! Core types for audiofeed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of submitted resource, which also selects the pipeline variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Video link, acquired as original audio
    Video,
    /// Article link, extracted and synthesized to speech
    Article,
    /// Video link, acquired as a translated voiceover
    Voiceover,
}

impl ResourceKind {
    /// Namespace tag prepended to every resource id of this kind
    pub fn namespace(&self) -> &'static str {
        match self {
            ResourceKind::Video => "yt",
            ResourceKind::Article => "art",
            ResourceKind::Voiceover => "vo",
        }
    }

    /// Inverse of [`ResourceKind::namespace`]
    pub fn from_namespace(ns: &str) -> Option<Self> {
        match ns {
            "yt" => Some(ResourceKind::Video),
            "art" => Some(ResourceKind::Article),
            "vo" => Some(ResourceKind::Voiceover),
            _ => None,
        }
    }
}

/// Namespaced resource identifier, unique within a feed
///
/// Renders as `<namespace>:<raw>`, so a video id and an article hash with
/// the same literal value never share a dedup key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Build a namespaced id from a raw video id or article hash
    pub fn new(kind: ResourceKind, raw: &str) -> Self {
        Self(format!("{}:{}", kind.namespace(), raw))
    }

    /// The full key as stored
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource kind encoded in the namespace
    pub fn kind(&self) -> Option<ResourceKind> {
        self.0
            .split_once(':')
            .and_then(|(ns, _)| ResourceKind::from_namespace(ns))
    }

    /// The id without its namespace
    pub fn raw(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, raw)| raw)
    }

    /// Audio file name for this resource within `feed`
    ///
    /// Derived from the dedup key, so the same resource always maps to the
    /// same file and different feeds never share one.
    pub fn file_name(&self, feed: &str) -> String {
        let digest = Sha256::digest(format!("{}::{}", feed, self.0).as_bytes());
        format!("{:x}.mp3", digest)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ResourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ns, raw)) if !raw.is_empty() => match ResourceKind::from_namespace(ns) {
                Some(kind) => Ok(Self::new(kind, raw)),
                None => Err(format!("unknown resource namespace: {ns}")),
            },
            _ => Err(format!("malformed resource id: {s}")),
        }
    }
}

// Stored as TEXT
impl sqlx::Type<sqlx::Sqlite> for ResourceId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ResourceId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ResourceId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// One ingested item in a named feed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Logical feed this entry belongs to
    pub feed_name: String,
    /// Namespaced id, unique within the feed
    pub resource_id: ResourceId,
    /// Display title (carries the voiceover method tag when applicable)
    pub title: String,
    /// Source link
    pub link: String,
    /// Author or site name
    pub author_name: String,
    /// Author or channel link
    pub author_uri: String,
    /// Description text
    pub description: String,
    /// Thumbnail image URL
    pub thumbnail_url: String,
    /// Publication time, used for ordering and retention
    pub published: DateTime<Utc>,
    /// Last update time
    pub updated: DateTime<Utc>,
    /// Path of the audio file on disk; the store never touches the bytes
    pub file_path: String,
    /// Audio length in seconds
    pub duration_secs: u64,
}

/// Metadata reported by the media source for a resource URL
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Source-native id (11-char video id)
    pub id: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Uploader or channel name
    pub author: String,
    /// Uploader or channel link
    pub author_url: String,
    /// Reported duration in seconds (0 when unknown)
    pub duration_secs: u64,
    /// Thumbnail image URL
    pub thumbnail_url: String,
    /// Canonical source URL
    pub source_url: String,
    /// Upload date as `YYYYMMDD`, when the source reports one
    pub upload_date: Option<String>,
}

impl Metadata {
    /// Parse [`Metadata::upload_date`] into a UTC midnight timestamp
    pub fn published(&self) -> Option<DateTime<Utc>> {
        let date = chrono::NaiveDate::parse_from_str(self.upload_date.as_deref()?, "%Y%m%d").ok()?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    }
}

/// Readable content pulled out of an article page
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    /// Article title
    pub title: String,
    /// Plain text body
    pub text_content: String,
    /// Lead image URL, if any
    pub image: Option<String>,
    /// Site name, if any
    pub site_name: Option<String>,
}

/// An official dubbed audio track offered by the source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubbedTrack {
    /// Language tag (`ru`, `ru-RU`, ...)
    pub language: String,
    /// Downloader format id for the track
    pub format_id: String,
}

impl DubbedTrack {
    /// Exact match, or prefix match in either direction (`ru` ~ `ru-RU`)
    pub fn matches_language(&self, target: &str) -> bool {
        let lang = self.language.to_lowercase();
        let target = target.to_lowercase();
        lang == target
            || lang.starts_with(&format!("{target}-"))
            || target.starts_with(&format!("{lang}-"))
    }
}

/// Strategy that produced a voiceover
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceoverMethod {
    /// Official dubbed track downloaded directly
    YoutubeDubbed,
    /// Subtitles translated and synthesized to speech
    SubtitlesTts,
    /// Full-media voice translation tool
    VotCli,
}

impl VoiceoverMethod {
    /// Tag shown in entry titles
    pub fn tag(&self) -> &'static str {
        match self {
            VoiceoverMethod::YoutubeDubbed => "youtube-dubbed",
            VoiceoverMethod::SubtitlesTts => "subtitles-tts",
            VoiceoverMethod::VotCli => "vot-cli",
        }
    }
}

impl std::fmt::Display for VoiceoverMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Pipeline state machine position
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Accepted, not yet started
    Pending,
    /// Deriving the namespaced resource id
    ResolvingId,
    /// Consulting the processed-marker ledger
    DedupCheck,
    /// Running the kind-specific acquisition
    Acquiring,
    /// Saving the entry
    Persisting,
    /// Recording the processed marker
    MarkingProcessed,
    /// Enforcing the retention bound
    Evicting,
    /// Terminal
    Reporting,
}

impl Stage {
    /// Short operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Pending => "queued",
            Stage::ResolvingId => "resolving",
            Stage::DedupCheck => "checking",
            Stage::Acquiring => "acquiring",
            Stage::Persisting => "saving",
            Stage::MarkingProcessed => "saving",
            Stage::Evicting => "cleaning up",
            Stage::Reporting => "done",
        }
    }
}

/// Terminal success of a pipeline run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// A new entry was persisted
    Added {
        /// Entry title
        title: String,
        /// Audio length in seconds
        duration_secs: u64,
        /// Voiceover strategy, for voiceover runs
        method: Option<VoiceoverMethod>,
    },
    /// The entry was persisted but is older than everything the retention
    /// bound keeps, so the same run evicted it again
    Evicted {
        /// Entry title
        title: String,
    },
    /// The resource was already ingested (ledger hit or lost save race)
    AlreadyExists {
        /// Title, when known at the point of detection
        title: Option<String>,
    },
}

/// Event emitted during the ingestion lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Submission accepted and pipeline launched
    Submitted {
        /// Resource kind
        kind: ResourceKind,
        /// Submitted URL
        url: String,
    },

    /// Pipeline moved to a new stage
    StageChanged {
        /// Resource being processed
        resource_id: ResourceId,
        /// New stage
        stage: Stage,
    },

    /// Entry persisted
    Added {
        /// Feed name
        feed: String,
        /// Resource id
        resource_id: ResourceId,
        /// Entry title
        title: String,
    },

    /// Resource was already in the feed
    AlreadyExists {
        /// Feed name
        feed: String,
        /// Resource id
        resource_id: ResourceId,
    },

    /// Pipeline failed
    Failed {
        /// Resource id, when resolved before the failure
        #[serde(skip_serializing_if = "Option::is_none")]
        resource_id: Option<ResourceId>,
        /// Machine-readable code
        code: String,
        /// Human-readable cause
        error: String,
    },

    /// Entries removed by retention eviction
    Evicted {
        /// Feed name
        feed: String,
        /// Number of entries removed
        count: usize,
    },

    /// Entry removed by an operator command
    Deleted {
        /// Feed name
        feed: String,
        /// Resource id
        resource_id: ResourceId,
    },

    /// Shutdown initiated
    Shutdown,
}
