//! Subtitle files to plain transcript text

use crate::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
static VTT_TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}[.,]\d{3}\s*-->").unwrap());
#[allow(clippy::unwrap_used)]
static SRT_TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2},\d{3}\s*-->").unwrap());
#[allow(clippy::unwrap_used)]
static SEQUENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
#[allow(clippy::unwrap_used)]
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Read a `.vtt` or `.srt` file and return its spoken text
pub async fn parse_subtitle_file(path: &Path) -> Result<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| crate::error::io_at(path, e))?;

    let is_vtt = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("vtt"));
    Ok(if is_vtt {
        parse_vtt(&content)
    } else {
        parse_srt(&content)
    })
}

/// Cue text from WebVTT, tags stripped and consecutive repeats dropped
pub fn parse_vtt(content: &str) -> String {
    let mut lines = Lines::default();
    let mut in_cue = false;

    for line in content.lines().map(str::trim) {
        if line.is_empty()
            || line == "WEBVTT"
            || ["NOTE", "STYLE", "Kind:", "Language:"]
                .iter()
                .any(|p| line.starts_with(p))
        {
            in_cue = false;
            continue;
        }
        if VTT_TIMESTAMP_RE.is_match(line) {
            in_cue = true;
            continue;
        }
        // cue identifiers precede the timestamp line
        if in_cue {
            lines.push(line);
        }
    }

    lines.join()
}

/// Cue text from SubRip, tags stripped and consecutive repeats dropped
pub fn parse_srt(content: &str) -> String {
    let mut lines = Lines::default();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || SEQUENCE_RE.is_match(line) || SRT_TIMESTAMP_RE.is_match(line) {
            continue;
        }
        lines.push(line);
    }

    lines.join()
}

/// Accumulates cleaned cue lines, skipping a line equal to the previous one
#[derive(Default)]
struct Lines {
    kept: Vec<String>,
}

impl Lines {
    fn push(&mut self, raw: &str) {
        let line = TAG_RE.replace_all(raw, "");
        let line = line.trim();
        if line.is_empty() || self.kept.last().is_some_and(|last| last == line) {
            return;
        }
        self.kept.push(line.to_string());
    }

    fn join(self) -> String {
        self.kept.join(" ")
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const VTT: &str = "WEBVTT\n\
Kind: captions\n\
Language: en\n\
\n\
intro\n\
00:00:00.000 --> 00:00:02.000 align:start position:0%\n\
Hello<00:00:00.500><c> world</c>\n\
\n\
00:00:02.000 --> 00:00:04.000\n\
Hello world\n\
next line\n\
\n\
NOTE this is a comment\n\
\n\
00:00:04.000 --> 00:00:06.000\n\
<i>the end</i>\n";

    const SRT: &str = "1\n\
00:00:00,000 --> 00:00:02,000\n\
First <b>line</b>\n\
\n\
2\n\
00:00:02,000 --> 00:00:04,000\n\
First line\n\
Second line\n";

    #[test]
    fn test_parse_vtt() {
        assert_eq!(parse_vtt(VTT), "Hello world next line the end");
    }

    #[test]
    fn test_parse_srt() {
        assert_eq!(parse_srt(SRT), "First line Second line");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(parse_vtt("WEBVTT\n\n"), "");
        assert_eq!(parse_srt(""), "");
    }

    #[tokio::test]
    async fn test_parse_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let vtt = dir.path().join("sub.en.vtt");
        let srt = dir.path().join("sub.ru.srt");
        std::fs::write(&vtt, VTT).unwrap();
        std::fs::write(&srt, SRT).unwrap();

        assert_eq!(
            parse_subtitle_file(&vtt).await.unwrap(),
            "Hello world next line the end"
        );
        assert_eq!(
            parse_subtitle_file(&srt).await.unwrap(),
            "First line Second line"
        );
        assert!(parse_subtitle_file(&dir.path().join("missing.vtt")).await.is_err());
    }
}
