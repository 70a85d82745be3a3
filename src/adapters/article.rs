//! Article extraction through a reader service
//!
//! The reader service (r.jina.ai compatible) is asked for `<base>/<url>` and
//! answers with a small plain-text envelope:
//!
//! ```text
//! Title: Some headline
//! URL Source: https://example.com/post
//! Markdown Content:
//! # Some headline
//! Body paragraphs...
//! ```
//!
//! The body is reduced to speakable text: markdown markup is removed, blank
//! lines are dropped and runs of spaces collapsed.

use super::traits::ArticleExtractor;
use crate::error::ArticleError;
use crate::types::ArticleContent;
use crate::Result;
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

const MAX_CONTENT_SIZE: usize = 5 * 1024 * 1024;

#[allow(clippy::unwrap_used)]
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
#[allow(clippy::unwrap_used)]
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
#[allow(clippy::unwrap_used)]
static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_`]{1,3}").unwrap());
#[allow(clippy::unwrap_used)]
static FIRST_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\((https?://[^)\s]+)").unwrap());

/// Extracts articles via a reader service over HTTP
pub struct ReaderExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ReaderExtractor {
    /// Create an extractor against `base_url` (e.g. `https://r.jina.ai`)
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, ArticleError> {
        let fetch_failed = |reason: String| ArticleError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let mut request = self
            .client
            .get(format!("{}/{}", self.base_url, url))
            .header("Accept", "text/plain");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| fetch_failed(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| fetch_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_failed(format!("HTTP {}", response.status().as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > MAX_CONTENT_SIZE
        {
            return Err(fetch_failed(format!("response exceeds {} bytes", MAX_CONTENT_SIZE)));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fetch_failed(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > MAX_CONTENT_SIZE {
                return Err(fetch_failed(format!("response exceeds {} bytes", MAX_CONTENT_SIZE)));
            }
            bytes.extend_from_slice(&chunk);
        }

        String::from_utf8(bytes).map_err(|_| ArticleError::ParseFailed("response is not UTF-8".into()))
    }
}

#[async_trait]
impl ArticleExtractor for ReaderExtractor {
    async fn extract(&self, url: &str) -> Result<ArticleContent> {
        let body = self.fetch(url).await?;
        let mut article = parse_reader_response(&body)?;
        article.site_name = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()));

        tracing::info!(
            url,
            title = %article.title,
            chars = article.text_content.chars().count(),
            "Extracted article"
        );
        Ok(article)
    }
}

/// Split the reader envelope into title and cleaned body
fn parse_reader_response(body: &str) -> std::result::Result<ArticleContent, ArticleError> {
    let mut title = String::new();
    let markdown = match body.split_once("Markdown Content:") {
        Some((header, content)) => {
            title = header
                .lines()
                .find_map(|l| l.strip_prefix("Title:"))
                .map(|t| t.trim().to_string())
                .unwrap_or_default();
            content
        }
        None if body.trim_start().starts_with("Title:") => {
            return Err(ArticleError::ParseFailed(
                "reader response has a header but no content section".into(),
            ));
        }
        None => body,
    };

    let image = FIRST_IMAGE_RE
        .captures(markdown)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let text = clean_text(&strip_markdown(markdown));
    if text.is_empty() {
        return Err(ArticleError::NoContent);
    }

    if title.is_empty() {
        title = text.lines().next().unwrap_or_default().chars().take(120).collect();
    }

    Ok(ArticleContent {
        title,
        text_content: text,
        image,
        site_name: None,
    })
}

/// Remove markdown markup that would be read aloud
fn strip_markdown(markdown: &str) -> String {
    markdown
        .lines()
        .filter(|line| {
            let t = line.trim();
            // horizontal rules and setext underlines
            !(t.len() >= 3 && t.chars().all(|c| matches!(c, '-' | '=' | '*' | '_')))
        })
        .map(|line| {
            let line = IMAGE_RE.replace_all(line, "");
            let line = LINK_RE.replace_all(&line, "$1");
            let line = line.trim_start().trim_start_matches('#').trim_start_matches('>');
            let line = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .unwrap_or(line);
            EMPHASIS_RE.replace_all(line, "").into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop blank lines, trim each line and collapse repeated spaces
fn clean_text(text: &str) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = String::with_capacity(joined.len());
    let mut prev_space = false;
    for c in joined.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}
