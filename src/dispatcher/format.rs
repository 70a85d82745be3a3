//! Operator-facing message text

use crate::Error;
use crate::config::Config;
use crate::types::{Entry, Outcome, ResourceKind, VoiceoverMethod};

pub(crate) const DENIAL: &str = "Unauthorized. This bot is private.";

/// `H:MM:SS` from one hour on, `M:SS` below
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub(crate) fn acknowledgement(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Video => "⏳ Processing...",
        ResourceKind::Article => "⏳ Converting article to audio...",
        ResourceKind::Voiceover => "⏳ Preparing voiceover...",
    }
}

pub(crate) fn outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Added {
            title,
            duration_secs,
            method,
        } => {
            let via = match method {
                Some(VoiceoverMethod::YoutubeDubbed) => " via dubbed track",
                Some(VoiceoverMethod::SubtitlesTts) => " via subtitles",
                Some(VoiceoverMethod::VotCli) => " via voice translation",
                None => "",
            };
            format!("✅ {title} ({}){via}", format_duration(*duration_secs))
        }
        Outcome::Evicted { title } => {
            format!("⚠️ Older than every entry kept in the feed, evicted right away: {title}")
        }
        Outcome::AlreadyExists { title: Some(title) } => format!("⚠️ Already in feed: {title}"),
        Outcome::AlreadyExists { title: None } => "⚠️ Already in feed".to_string(),
    }
}

pub(crate) fn failure(error: &Error) -> String {
    format!("❌ Error: {error}")
}

pub(crate) fn unrecognized(articles_enabled: bool) -> String {
    let mut text = String::from(
        "No valid URL found. Send a link:\n• YouTube: https://youtube.com/watch?v=VIDEO_ID",
    );
    if articles_enabled {
        text.push_str("\n• Article: any web page URL");
    }
    text
}

pub(crate) fn help(config: &Config) -> String {
    let mut text = format!(
        "🎧 {}\n\n\
         Send a URL to add audio to your feed:\n\
         • YouTube video → downloads audio\n",
        config.feed.feed_title
    );
    if config.article.enabled {
        text.push_str("• Article/webpage → read aloud\n");
    }
    text.push_str(&format!(
        "\nCommands:\n\
         /vo <url> - YouTube voiceover in {}\n\
         /list - recent entries in feed\n\
         /history - all entries with links\n\
         /del - delete most recent\n\
         /del N - delete entry N\n\
         /help - this help\n",
        config.voiceover.target_lang
    ));
    if let Some(base) = &config.feed.base_url {
        text.push_str(&format!(
            "\nRSS: {}/yt/rss/{}",
            base.trim_end_matches('/'),
            config.feed.feed_name
        ));
    }
    text
}

fn numbered(entries: &[Entry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {} ({})\n", i + 1, e.title, format_duration(e.duration_secs)))
        .collect()
}

pub(crate) fn list(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "No entries in feed yet.".to_string();
    }
    format!("Recent entries ({}):\n\n{}", entries.len(), numbered(entries))
}

pub(crate) fn history(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "No entries added yet.".to_string();
    }
    let body: String = entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {}\n{}\n\n", i + 1, e.title, e.link))
        .collect();
    format!("📜 History ({}):\n\n{}", entries.len(), body.trim_end())
}

pub(crate) fn deleted(title: &str, remaining: Result<&[Entry], &Error>) -> String {
    match remaining {
        Ok([]) => format!("🗑 Deleted: {title}\n\nFeed is now empty."),
        Ok(entries) => format!(
            "🗑 Deleted: {title}\n\nRemaining ({}):\n{}",
            entries.len(),
            numbered(entries)
        ),
        Err(e) => format!("🗑 Deleted: {title}\n\n(Error loading updated list: {e})"),
    }
}
