//! Text translation over HTTP mirrors
//!
//! [`MirrorTranslator`] owns an ordered list of [`TranslationBackend`]s. Long
//! input is split at paragraph boundaries; each chunk is offered to the
//! mirrors in declared order and the first answer wins. Chunks are sent one
//! at a time with a fixed pause between them.

use super::text::{detect_language, split_paragraphs};
use super::traits::{TranslationBackend, Translator};
use crate::config::{TranslationBackendKind, TranslationConfig, TranslationMirror};
use crate::fallback::run_in_order;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Yandex Cloud Translate v2 endpoint
pub struct YandexBackend {
    client: reqwest::Client,
    url: String,
    api_key: String,
    folder_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct YandexRequest<'a> {
    folder_id: &'a str,
    target_language_code: &'a str,
    texts: [&'a str; 1],
}

#[derive(Deserialize)]
struct YandexResponse {
    #[serde(default)]
    translations: Vec<YandexTranslation>,
}

#[derive(Deserialize)]
struct YandexTranslation {
    text: String,
}

impl YandexBackend {
    /// Create a backend posting to `url`
    pub fn new(client: reqwest::Client, url: String, api_key: String, folder_id: String) -> Self {
        Self {
            client,
            url,
            api_key,
            folder_id,
        }
    }
}

#[async_trait]
impl TranslationBackend for YandexBackend {
    async fn translate_chunk(&self, text: &str, target_lang: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&YandexRequest {
                folder_id: &self.folder_id,
                target_language_code: target_lang,
                texts: [text],
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Translation(format!(
                "{} returned {}: {}",
                self.url,
                status.as_u16(),
                body.trim()
            )));
        }

        let parsed: YandexResponse = response.json().await?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| Error::Translation(format!("{} returned no translations", self.url)))
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// LibreTranslate-compatible endpoint
pub struct LibreTranslateBackend {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

impl LibreTranslateBackend {
    /// Create a backend posting to `url`
    pub fn new(client: reqwest::Client, url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            url,
            api_key,
        }
    }
}

#[async_trait]
impl TranslationBackend for LibreTranslateBackend {
    async fn translate_chunk(&self, text: &str, target_lang: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&LibreRequest {
                q: text,
                source: "auto",
                target: target_lang,
                format: "text",
                api_key: self.api_key.as_deref(),
            })
            .send()
            .await?;

        let status = response.status();
        let parsed: LibreResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(Error::Translation(format!(
                    "{} returned {}",
                    self.url,
                    status.as_u16()
                )));
            }
        };

        match (status.is_success(), parsed.translated_text, parsed.error) {
            (true, Some(text), _) => Ok(text),
            (_, _, Some(error)) => Err(Error::Translation(format!("{}: {}", self.url, error))),
            _ => Err(Error::Translation(format!(
                "{} returned {} without a translation",
                self.url,
                status.as_u16()
            ))),
        }
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// Translator that falls back across mirrors for every chunk
pub struct MirrorTranslator {
    backends: Vec<Arc<dyn TranslationBackend>>,
    max_chunk_chars: usize,
    chunk_delay: Duration,
}

impl MirrorTranslator {
    /// Create from explicit backends in priority order
    pub fn new(
        backends: Vec<Arc<dyn TranslationBackend>>,
        max_chunk_chars: usize,
        chunk_delay: Duration,
    ) -> Self {
        Self {
            backends,
            max_chunk_chars,
            chunk_delay,
        }
    }

    /// Build the configured mirrors, sharing one HTTP client
    pub fn from_config(config: &TranslationConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let backends = config
            .mirrors
            .iter()
            .map(|mirror| backend_for(client.clone(), mirror))
            .collect();

        Ok(Self::new(backends, config.max_chunk_chars, config.chunk_delay))
    }

    /// Translate one chunk, trying mirrors in order
    async fn translate_chunk(&self, chunk: &str, target_lang: &str) -> Result<String> {
        // indices keep the candidate list free of borrows across awaits
        run_in_order(
            0..self.backends.len(),
            |idx| self.backends[idx].translate_chunk(chunk, target_lang),
            |idx, e| {
                tracing::warn!(mirror = self.backends[*idx].name(), error = %e, "Translation mirror failed");
                true
            },
        )
        .await
        .map(|success| success.value)
        .map_err(|e| {
            e.into_error(|| Error::NotSupported("no translation mirrors configured".into()))
        })
    }
}

fn backend_for(client: reqwest::Client, mirror: &TranslationMirror) -> Arc<dyn TranslationBackend> {
    match mirror.kind {
        TranslationBackendKind::Yandex => Arc::new(YandexBackend::new(
            client,
            mirror.url.clone(),
            mirror.api_key.clone().unwrap_or_default(),
            mirror.folder_id.clone().unwrap_or_default(),
        )),
        TranslationBackendKind::LibreTranslate => Arc::new(LibreTranslateBackend::new(
            client,
            mirror.url.clone(),
            mirror.api_key.clone(),
        )),
    }
}

#[async_trait]
impl Translator for MirrorTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let source = detect_language(text);
        if source == target_lang {
            return Ok(text.to_string());
        }

        let chunks = split_paragraphs(text, self.max_chunk_chars);
        let total = chunks.len();
        let mut translated = Vec::with_capacity(total);

        for (idx, chunk) in chunks.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.chunk_delay).await;
            }
            tracing::debug!(chunk = idx + 1, total, source, target_lang, "Translating chunk");
            translated.push(self.translate_chunk(chunk, target_lang).await?);
        }

        tracing::info!(chunks = total, source, target_lang, "Translated text");
        Ok(translated.join("\n\n"))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn libre(server: &MockServer) -> Arc<dyn TranslationBackend> {
        Arc::new(LibreTranslateBackend::new(
            reqwest::Client::new(),
            format!("{}/translate", server.uri()),
            None,
        ))
    }

    async fn failing_mirror(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"error": "overloaded"})))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_third_mirror_wins_and_earlier_failures_are_hidden() {
        let first = failing_mirror(500).await;
        let second = failing_mirror(429).await;
        let third = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"target": "ru", "source": "auto"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Привет"})))
            .expect(1)
            .mount(&third)
            .await;

        let translator = MirrorTranslator::new(
            vec![libre(&first), libre(&second), libre(&third)],
            5000,
            Duration::from_millis(1),
        );

        assert_eq!(translator.translate("Hello", "ru").await.unwrap(), "Привет");
    }

    #[tokio::test]
    async fn test_mirror_fallback_runs_on_a_spawned_task() {
        let first = failing_mirror(503).await;
        let second = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Мир"})))
            .expect(1)
            .mount(&second)
            .await;

        let translator: Arc<dyn Translator> = Arc::new(MirrorTranslator::new(
            vec![libre(&first), libre(&second)],
            5000,
            Duration::from_millis(1),
        ));

        let out = tokio::spawn(async move { translator.translate("World", "ru").await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, "Мир");
    }

    #[tokio::test]
    async fn test_all_mirrors_failing_surfaces_last_error() {
        let first = failing_mirror(500).await;
        let second = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "bad language"})))
            .mount(&second)
            .await;

        let translator = MirrorTranslator::new(
            vec![libre(&first), libre(&second)],
            5000,
            Duration::from_millis(1),
        );

        let err = translator.translate("Hello", "ru").await.unwrap_err();
        assert!(err.to_string().contains("bad language"));
        assert!(!err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_text_already_in_target_is_returned_unchanged() {
        let translator = MirrorTranslator::new(Vec::new(), 5000, Duration::from_millis(1));
        assert_eq!(translator.translate("Уже по-русски", "ru").await.unwrap(), "Уже по-русски");
    }

    #[tokio::test]
    async fn test_no_mirrors_is_not_supported() {
        let translator = MirrorTranslator::new(Vec::new(), 5000, Duration::from_millis(1));
        let err = translator.translate("Hello", "ru").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_long_text_is_translated_per_paragraph_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"q": "First paragraph."})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Один."})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"q": "Second paragraph."})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Два."})))
            .mount(&server)
            .await;

        let translator = MirrorTranslator::new(vec![libre(&server)], 20, Duration::from_millis(1));
        let out = translator
            .translate("First paragraph.\n\nSecond paragraph.", "ru")
            .await
            .unwrap();
        assert_eq!(out, "Один.\n\nДва.");
    }

    #[tokio::test]
    async fn test_yandex_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Api-Key k1"))
            .and(body_partial_json(json!({
                "folderId": "f1",
                "targetLanguageCode": "ru",
                "texts": ["Hello"]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"translations": [{"text": "Привет"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = YandexBackend::new(
            reqwest::Client::new(),
            server.uri(),
            "k1".into(),
            "f1".into(),
        );
        assert_eq!(backend.translate_chunk("Hello", "ru").await.unwrap(), "Привет");
    }

    #[tokio::test]
    async fn test_yandex_error_status_is_translation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated"))
            .mount(&server)
            .await;

        let backend = YandexBackend::new(reqwest::Client::new(), server.uri(), "k".into(), "f".into());
        let err = backend.translate_chunk("Hello", "ru").await.unwrap_err();
        assert!(matches!(err, Error::Translation(_)));
        assert!(err.to_string().contains("401"));
    }
}
