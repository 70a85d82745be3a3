//! Inbound text to commands

use crate::classify::{Resource, classify_input, extract_video_id, watch_url};
use crate::pipeline::Request;
use crate::types::ResourceKind;

pub(crate) const DELETE_USAGE: &str = "Usage: /del [number]\nExample: /del 1 (delete most recent)";
pub(crate) const VOICEOVER_USAGE: &str =
    "Usage: /vo <youtube_url>\nExample: /vo https://youtube.com/watch?v=xxx";
pub(crate) const INVALID_VIDEO_URL: &str = "❌ Invalid YouTube URL";

/// What the principal asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `/help`
    Help,
    /// `/list`: newest entries with durations
    List,
    /// `/history`: all entries with links
    History,
    /// `/del [N]`: remove the N-th newest entry (1-based)
    Delete(usize),
    /// A URL or `/vo <url>`: start a pipeline
    Submit(Request),
    /// A command with bad arguments; the text explains the correct form
    Usage(&'static str),
    /// Nothing recognizable
    Unrecognized,
}

impl Command {
    /// Parse a message
    ///
    /// Bare URLs become video submissions when they point at a video and
    /// article submissions otherwise, the latter only with `articles_enabled`.
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str, articles_enabled: bool) -> Command {
        let text = text.trim();
        let Some(rest) = text.strip_prefix('/') else {
            return submission(text, articles_enabled);
        };

        let (word, argument) = match rest.split_once(char::is_whitespace) {
            Some((word, argument)) => (word, argument.trim()),
            None => (rest, ""),
        };
        let word = word.split_once('@').map_or(word, |(word, _)| word);

        match word {
            "start" | "help" => Command::Help,
            "list" => Command::List,
            "history" => Command::History,
            "del" => parse_delete(argument),
            "vo" => parse_voiceover(argument),
            _ => Command::Unrecognized,
        }
    }
}

fn submission(text: &str, articles_enabled: bool) -> Command {
    match classify_input(text) {
        Some(Resource::Video { url, .. }) => Command::Submit(Request::new(ResourceKind::Video, url)),
        Some(Resource::Article { url }) if articles_enabled => {
            Command::Submit(Request::new(ResourceKind::Article, url))
        }
        _ => Command::Unrecognized,
    }
}

fn parse_delete(argument: &str) -> Command {
    if argument.is_empty() {
        return Command::Delete(1);
    }
    match argument.parse::<usize>() {
        Ok(n) if n >= 1 => Command::Delete(n),
        _ => Command::Usage(DELETE_USAGE),
    }
}

fn parse_voiceover(argument: &str) -> Command {
    if argument.is_empty() {
        return Command::Usage(VOICEOVER_USAGE);
    }
    match extract_video_id(argument) {
        Some(id) => Command::Submit(Request::new(ResourceKind::Voiceover, watch_url(&id))),
        None => Command::Usage(INVALID_VIDEO_URL),
    }
}
