use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::Translator;
use crate::config::TranslationConfig;
use crate::{BridgeError, Result};

/// Free Google Translate web endpoint (`translate_a/single`, client `gtx`)
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
    target_language: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.google_base_url.trim_end_matches('/').to_string(),
            target_language: config.target_language.clone(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        tracing::debug!("Fallback translation of {} chars to {}", text.chars().count(), self.target_language);

        let response = self
            .client
            .post(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", self.target_language.as_str()),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!(BridgeError::TranslationFailed(format!(
                "Google Translate returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        parse_translation(&body)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The payload is a nested array: `[[["translated", "source", ...], ...], ...]`.
pub fn parse_translation(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| BridgeError::TranslationFailed("unexpected Google Translate response".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.trim().is_empty() {
        anyhow::bail!(BridgeError::TranslationFailed(
            "Google Translate returned no text".to_string()
        ));
    }

    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_translation_joins_segments() {
        let body = json!([
            [
                ["Bună ziua. ", "Good day. ", null, null, 10],
                ["Ce mai faci?", "How are you?", null, null, 10]
            ],
            null,
            "en"
        ]);
        assert_eq!(parse_translation(&body).unwrap(), "Bună ziua. Ce mai faci?");
    }

    #[test]
    fn test_parse_translation_skips_non_text_segments() {
        let body = json!([[["Salut", "Hi"], [null, null, "Salut"]], null, "en"]);
        assert_eq!(parse_translation(&body).unwrap(), "Salut");
    }

    #[test]
    fn test_parse_translation_rejects_unexpected_shapes() {
        assert!(parse_translation(&json!({"error": "bad"})).is_err());
        assert!(parse_translation(&json!([[], null, "en"])).is_err());
        assert!(parse_translation(&json!(null)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let config = TranslationConfig {
            google_base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..TranslationConfig::default()
        };
        let translator = GoogleTranslator::new(&config).unwrap();
        assert!(translator.translate("hello world").await.is_err());
    }
}
