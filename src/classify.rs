//! Closed-enum classifiers for submitted text and external tool failures
//!
//! Everything that turns free-form strings into decisions lives here:
//! which pipeline a message should start, and whether a tool failure
//! means the stored credentials have expired.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Phrases in downloader output that mean the stored cookies no longer work
pub const CREDENTIAL_EXPIRY_MARKERS: &[&str] = &[
    "cookies are no longer valid",
    "cookies have expired",
    "Please sign in",
    "Sign in to confirm your age",
    "Sign in to confirm you",
];

/// Path extensions that are never treated as articles
const NON_ARTICLE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".mp3", ".mp4", ".pdf", ".zip", ".rar",
];

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap()
});

static VIDEO_ID_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?(?:[^\s#]*&)?v=([a-zA-Z0-9_-]{11})",
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/v/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// What a submitted message refers to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    /// A video on a supported host
    Video {
        /// 11-character video id
        id: String,
        /// Canonical watch URL
        url: String,
    },
    /// Any other web page
    Article {
        /// The URL as submitted
        url: String,
    },
}

/// How an external tool failure should be treated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolFailure {
    /// Stored credentials were rejected; retry once without them
    CredentialExpired,
    /// Anything else; surfaced as-is
    Other,
}

/// Classify a tool's error output
pub fn classify_tool_failure(message: &str) -> ToolFailure {
    if CREDENTIAL_EXPIRY_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        ToolFailure::CredentialExpired
    } else {
        ToolFailure::Other
    }
}

/// Decide which pipeline, if any, a message should start
pub fn classify_input(text: &str) -> Option<Resource> {
    if let Some(id) = extract_video_id(text) {
        return Some(Resource::Video {
            url: watch_url(&id),
            id,
        });
    }

    let url = extract_url(text)?;
    let parsed = url::Url::parse(url).ok()?;
    let path = parsed.path().to_lowercase();
    if NON_ARTICLE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }
    Some(Resource::Article {
        url: url.to_string(),
    })
}

/// First http(s) URL in `text`
pub fn extract_url(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str())
}

/// Rewrite mobile and music hosts to the main video host
pub fn normalize_video_url(url: &str) -> String {
    url.replacen("m.youtube.com", "www.youtube.com", 1)
        .replacen("music.youtube.com", "www.youtube.com", 1)
}

/// Extract an 11-character video id from any supported link form
pub fn extract_video_id(text: &str) -> Option<String> {
    let text = normalize_video_url(text);
    VIDEO_ID_RES
        .iter()
        .find_map(|re| re.captures(&text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video id
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Normalize an article URL so trivially different spellings share an id
///
/// Trims whitespace, drops the fragment and a trailing slash, lower-cases the host.
pub fn normalize_article_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = url::Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_string();
    };
    parsed.set_fragment(None);
    // Url::parse already lower-cases special-scheme hosts
    let normalized = parsed.to_string();
    match normalized.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => normalized,
    }
}

/// Raw article id: first 16 hex chars of SHA-256 over the normalized URL
pub fn article_id(url: &str) -> String {
    let digest = Sha256::digest(normalize_article_url(url).as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(16);
    hex
}
