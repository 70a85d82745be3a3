//! yt-dlp backed media source

use super::process::{existing_output, run_tool};
use super::traits::{MediaSource, SubtitleFile};
use crate::classify::{ToolFailure, classify_tool_failure, watch_url};
use crate::config::TimeoutConfig;
use crate::fallback::{Credentials, run_in_order};
use crate::types::{DubbedTrack, Metadata};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TOOL: &str = "yt-dlp";

/// Subset of `yt-dlp --dump-json` output this crate reads
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    formats: Vec<Format>,
}

#[derive(Debug, Default, Deserialize)]
struct Format {
    #[serde(default)]
    format_id: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
}

impl From<VideoInfo> for Metadata {
    fn from(info: VideoInfo) -> Self {
        Metadata {
            source_url: info.webpage_url.unwrap_or_else(|| watch_url(&info.id)),
            id: info.id,
            title: info.title,
            description: info.description.unwrap_or_default(),
            author: info.uploader.unwrap_or_default(),
            author_url: info.channel_url.unwrap_or_default(),
            duration_secs: info.duration.map_or(0, |d| d.max(0.0).round() as u64),
            thumbnail_url: info.thumbnail.unwrap_or_default(),
            upload_date: info.upload_date,
        }
    }
}

/// Audio-only formats that carry a language, first format per language
fn dubbed_tracks(formats: &[Format]) -> Vec<DubbedTrack> {
    let mut seen = HashSet::new();
    formats
        .iter()
        .filter(|f| f.vcodec.as_deref() == Some("none"))
        .filter(|f| !matches!(f.acodec.as_deref(), None | Some("") | Some("none")))
        .filter_map(|f| {
            let language = f.language.as_deref().filter(|l| !l.is_empty())?;
            seen.insert(language.to_string()).then(|| DubbedTrack {
                language: language.to_string(),
                format_id: f.format_id.clone(),
            })
        })
        .collect()
}

/// Language of a downloaded subtitle file, from its `<stem>.<lang>.<ext>` name
fn subtitle_language(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if name.contains(".ru.") {
        "ru".to_string()
    } else {
        "en".to_string()
    }
}

/// First subtitle file written next to `stem`, preferring VTT over SRT
async fn find_subtitle_file(stem: &Path) -> Result<Option<PathBuf>> {
    let dir = stem.parent().unwrap_or(Path::new("."));
    let prefix = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut found: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| crate::error::io_at(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| crate::error::io_at(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) {
            found.push(entry.path());
        }
    }
    found.sort();

    for ext in ["vtt", "srt"] {
        if let Some(path) = found
            .iter()
            .find(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
        {
            return Ok(Some(path.clone()));
        }
    }
    Ok(None)
}

/// Media source driving the `yt-dlp` binary
pub struct YtDlp {
    binary: PathBuf,
    cookies: Option<PathBuf>,
    timeouts: TimeoutConfig,
}

impl YtDlp {
    /// Create with an explicit binary and optional cookies file
    pub fn new(binary: PathBuf, cookies: Option<PathBuf>, timeouts: TimeoutConfig) -> Self {
        Self {
            binary,
            cookies,
            timeouts,
        }
    }

    /// Run yt-dlp with the credential-expiry retry
    ///
    /// With a cookies file configured the first attempt passes it; if that
    /// attempt fails with a credential-expiry marker, one more attempt runs
    /// without it. Any other failure is returned immediately.
    async fn run(&self, args: Vec<OsString>, timeout: Duration) -> Result<Vec<u8>> {
        let result = run_in_order(
            Credentials::candidates(self.cookies.is_some()),
            |creds| {
                let mut full = Vec::with_capacity(args.len() + 2);
                if let (Credentials::With, Some(cookies)) = (creds, &self.cookies) {
                    full.push(OsString::from("--cookies"));
                    full.push(cookies.as_os_str().to_owned());
                }
                full.extend(args.iter().cloned());
                async move { run_tool(TOOL, &self.binary, &full, timeout).await }
            },
            |_, e| {
                let expired = classify_tool_failure(&e.to_string()) == ToolFailure::CredentialExpired;
                if expired {
                    tracing::warn!(error = %e, "Cookies rejected, retrying without them");
                }
                expired
            },
        )
        .await;

        result
            .map(|success| success.value)
            .map_err(|e| e.into_error(|| Error::tool(TOOL, "no attempt was made")))
    }

    async fn dump_json(&self, url: &str) -> Result<VideoInfo> {
        let stdout = self
            .run(
                vec!["--dump-json".into(), "--no-download".into(), "--no-playlist".into(), url.into()],
                self.timeouts.metadata,
            )
            .await?;

        serde_json::from_slice(&stdout)
            .map_err(|e| Error::tool(TOOL, format!("failed to parse metadata: {}", e)))
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn fetch_metadata(&self, url: &str) -> Result<Metadata> {
        let info = self.dump_json(url).await?;
        tracing::debug!(id = %info.id, title = %info.title, "Fetched metadata");
        Ok(info.into())
    }

    async fn acquire_media(&self, id: &str, dest: &Path) -> Result<PathBuf> {
        self.run(
            vec![
                "--extract-audio".into(),
                "--audio-format".into(),
                "mp3".into(),
                "--audio-quality".into(),
                "0".into(),
                "-f".into(),
                "m4a/bestaudio".into(),
                "--no-progress".into(),
                "-o".into(),
                dest.as_os_str().to_owned(),
                watch_url(id).into(),
            ],
            self.timeouts.download,
        )
        .await?;

        existing_output(dest)
            .await
            .ok_or_else(|| Error::Skip(format!("{} produced no audio for {}", TOOL, id)))
    }

    async fn list_dubbed_tracks(&self, url: &str) -> Result<Vec<DubbedTrack>> {
        let info = self.dump_json(url).await?;
        let tracks = dubbed_tracks(&info.formats);
        tracing::info!(url, tracks = tracks.len(), "Listed audio tracks");
        Ok(tracks)
    }

    async fn download_track(&self, url: &str, track: &DubbedTrack, dest: &Path) -> Result<PathBuf> {
        tracing::info!(url, language = %track.language, format = %track.format_id, "Downloading dubbed track");
        self.run(
            vec![
                "-f".into(),
                track.format_id.clone().into(),
                "--extract-audio".into(),
                "--audio-format".into(),
                "mp3".into(),
                "--audio-quality".into(),
                "128K".into(),
                "--no-progress".into(),
                "-o".into(),
                dest.as_os_str().to_owned(),
                url.into(),
            ],
            self.timeouts.download,
        )
        .await?;

        existing_output(dest)
            .await
            .ok_or_else(|| Error::tool(TOOL, "downloaded track is missing or empty"))
    }

    async fn download_subtitles(&self, url: &str, stem: &Path) -> Result<SubtitleFile> {
        self.run(
            vec![
                "--write-sub".into(),
                "--write-auto-sub".into(),
                "--sub-lang".into(),
                "en,ru".into(),
                "--sub-format".into(),
                "vtt/srt/best".into(),
                "--skip-download".into(),
                "--no-playlist".into(),
                "--extractor-args".into(),
                "youtube:player_client=web_creator".into(),
                "--output".into(),
                stem.as_os_str().to_owned(),
                url.into(),
            ],
            self.timeouts.subtitles,
        )
        .await?;

        let path = find_subtitle_file(stem)
            .await?
            .ok_or_else(|| Error::tool(TOOL, "no subtitle file found"))?;
        let language = subtitle_language(&path);
        tracing::info!(path = %path.display(), language, "Downloaded subtitles");
        Ok(SubtitleFile { path, language })
    }

    fn name(&self) -> &'static str {
        TOOL
    }
}
