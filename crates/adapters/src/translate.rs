//! Translation adapters: inline HTTP translation or generated translator links

use async_trait::async_trait;
use feed_relay_domain::{Translation, TranslationError, Translator, TranslatorLink};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;

/// Inline translator backed by the public Google translate endpoint
/// (`client=gtx`, works without an API key).
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
    target_lang: String,
    api_key: Option<SecretString>,
}

impl GoogleTranslator {
    pub fn new(target_lang: String, api_key: Option<SecretString>) -> Self {
        Self::with_base_url(
            target_lang,
            api_key,
            "https://translate.googleapis.com".to_string(),
        )
    }

    pub fn with_base_url(
        target_lang: String,
        api_key: Option<SecretString>,
        base_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            target_lang,
            api_key,
        }
    }

    /// The response is a nested array; each element of the first array is a
    /// segment whose first field is the translated text.
    fn extract_translation(body: &Value) -> Result<String, TranslationError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| TranslationError::InvalidFormat(body.to_string()))?;

        let mut out = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(Value::as_str) {
                out.push_str(part);
            }
        }

        if out.is_empty() {
            return Err(TranslationError::InvalidFormat("empty translation".to_string()));
        }
        Ok(out)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<Translation, TranslationError> {
        let url = format!("{}/translate_a/single", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![
            ("client", "gtx"),
            ("sl", "auto"),
            ("tl", &self.target_lang),
            ("dt", "t"),
            ("q", text),
        ];
        let key;
        if let Some(api_key) = &self.api_key {
            key = api_key.expose_secret().to_string();
            query.push(("key", &key));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslationError::Service(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidFormat(e.to_string()))?;

        Ok(Translation::Inline(Self::extract_translation(&body)?))
    }
}

/// Link-generating translator: no network call, never fails.
pub struct LinkTranslator {
    target_lang: String,
}

impl LinkTranslator {
    pub fn new(target_lang: String) -> Self {
        Self { target_lang }
    }
}

#[async_trait]
impl Translator for LinkTranslator {
    async fn translate(&self, text: &str) -> Result<Translation, TranslationError> {
        let escaped = urlencoding::encode(text);
        let lang = &self.target_lang;

        Ok(Translation::Links(vec![
            TranslatorLink {
                name: "Google".to_string(),
                url: format!(
                    "https://translate.google.com/?sl=auto&tl={}&text={}&op=translate",
                    lang, escaped
                ),
            },
            TranslatorLink {
                name: "Papago".to_string(),
                url: format!("https://papago.naver.com/?sk=auto&tk={}&st={}", lang, escaped),
            },
            TranslatorLink {
                name: "DeepL".to_string(),
                url: format!("https://www.deepl.com/translator#auto/{}/{}", lang, escaped),
            },
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn inline_translation_concatenates_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("tl", "ko"))
            .and(query_param("q", "Hello. World."))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                [
                    ["안녕하세요. ", "Hello. ", null],
                    ["세계.", "World.", null]
                ],
                null,
                "en"
            ])))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::with_base_url("ko".to_string(), None, server.uri());
        let translation = translator.translate("Hello. World.").await.unwrap();

        assert_eq!(
            translation,
            Translation::Inline("안녕하세요. 세계.".to_string())
        );
    }

    #[tokio::test]
    async fn service_failure_is_a_translation_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::with_base_url("ko".to_string(), None, server.uri());
        let err = translator.translate("anything").await.unwrap_err();
        assert!(matches!(err, TranslationError::Service(_)));
    }

    #[tokio::test]
    async fn unexpected_body_is_invalid_format() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"odd": true})))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::with_base_url("ko".to_string(), None, server.uri());
        let err = translator.translate("anything").await.unwrap_err();
        assert!(matches!(err, TranslationError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn link_translator_escapes_text() {
        let translator = LinkTranslator::new("ko".to_string());
        let translation = translator.translate("to the moon & back").await.unwrap();

        let Translation::Links(links) = translation else {
            panic!("expected links");
        };
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].name, "Google");
        assert!(links[0].url.contains("text=to%20the%20moon%20%26%20back"));
        assert!(links.iter().all(|l| !l.url.contains(' ')));
    }
}
