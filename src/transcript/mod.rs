use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::extractors::CaptionProvider;
use crate::subtitles::normalize_vtt;
use crate::translate::TranslationPolicy;

/// Shown when neither captions nor a description are available
pub const NO_TEXT_FOUND: &str = "Niciun text găsit.";

/// Characters of the original transcript returned to clients
pub const ORIGINAL_PREVIEW_CHARS: usize = 1000;

/// Original and translated transcript of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub original: String,
    pub translated: String,
}

impl Transcript {
    /// Copy with the original shortened for API responses
    pub fn preview(&self) -> Self {
        Self {
            original: crate::utils::preview(&self.original, ORIGINAL_PREVIEW_CHARS),
            translated: self.translated.clone(),
        }
    }
}

/// Captions -> plain text -> translation, degrading at every step
pub struct TranscriptService {
    captions: Arc<dyn CaptionProvider>,
    translator: Arc<TranslationPolicy>,
    caption_language: String,
}

impl TranscriptService {
    pub fn new(
        captions: Arc<dyn CaptionProvider>,
        translator: Arc<TranslationPolicy>,
        caption_language: impl Into<String>,
    ) -> Self {
        Self {
            captions,
            translator,
            caption_language: caption_language.into(),
        }
    }

    /// Plain caption text for `url`, or `None` when no usable captions exist
    pub async fn original_text(&self, url: &str) -> Option<String> {
        match self.captions.fetch_captions(url, &self.caption_language).await {
            Ok(Some(vtt)) => {
                let text = normalize_vtt(&vtt);
                if text.is_empty() {
                    tracing::info!("Caption track for {} contained no text", url);
                    None
                } else {
                    Some(text.into_string())
                }
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Caption extraction failed for {}: {:#}", url, e);
                None
            }
        }
    }

    /// Build the transcript, falling back to `description` and then to a fixed notice
    pub async fn build(&self, url: &str, description: Option<&str>) -> Transcript {
        let captions = self.original_text(url).await;
        self.finish(captions, description).await
    }

    /// Translate already extracted caption text, or the fallback text when there is none
    pub async fn finish(&self, captions: Option<String>, description: Option<&str>) -> Transcript {
        let original = captions.unwrap_or_else(|| fallback_text(description));
        let translated = self.translator.translate(&original).await;

        Transcript { original, translated }
    }
}

/// Text used when a video has no usable captions
pub fn fallback_text(description: Option<&str>) -> String {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_TEXT_FOUND)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::MockCaptionProvider;
    use crate::translate::{MockStreamingTranslator, MockTranslator};

    fn echo_policy() -> Arc<TranslationPolicy> {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(false);
        let mut secondary = MockTranslator::new();
        secondary
            .expect_translate()
            .returning(|text| Ok(format!("[ro] {}", text)));
        Arc::new(TranslationPolicy::new(Arc::new(primary), Arc::new(secondary), 3000, 5))
    }

    fn service(captions: MockCaptionProvider) -> TranscriptService {
        TranscriptService::new(Arc::new(captions), echo_policy(), "en")
    }

    #[tokio::test]
    async fn test_captions_are_normalized_and_translated() {
        let mut captions = MockCaptionProvider::new();
        captions
            .expect_fetch_captions()
            .withf(|_, language: &str| language == "en")
            .returning(|_, _| {
                Ok(Some(
                    "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nhello world\nhello world\nhi\n".to_string(),
                ))
            });

        let transcript = service(captions).build("https://youtu.be/x", Some("desc")).await;
        assert_eq!(transcript.original, "hello world hi");
        assert_eq!(transcript.translated, "[ro] hello world hi");
    }

    #[tokio::test]
    async fn test_missing_captions_use_description() {
        let mut captions = MockCaptionProvider::new();
        captions.expect_fetch_captions().returning(|_, _| Ok(None));

        let transcript = service(captions)
            .build("https://youtu.be/x", Some("  A video about rust  "))
            .await;
        assert_eq!(transcript.original, "A video about rust");
        assert_eq!(transcript.translated, "[ro] A video about rust");
    }

    #[tokio::test]
    async fn test_caption_errors_are_absorbed() {
        let mut captions = MockCaptionProvider::new();
        captions
            .expect_fetch_captions()
            .returning(|_, _| Err(anyhow::anyhow!("yt-dlp crashed")));

        let transcript = service(captions).build("https://youtu.be/x", None).await;
        assert_eq!(transcript.original, NO_TEXT_FOUND);
        assert_eq!(transcript.translated, format!("[ro] {}", NO_TEXT_FOUND));
    }

    #[tokio::test]
    async fn test_markup_only_captions_fall_back() {
        let mut captions = MockCaptionProvider::new();
        captions
            .expect_fetch_captions()
            .returning(|_, _| Ok(Some("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n<c></c>\n".to_string())));

        assert_eq!(service(captions).original_text("https://youtu.be/x").await, None);
        assert_eq!(fallback_text(Some("   ")), NO_TEXT_FOUND);
    }

    #[test]
    fn test_preview_truncates_original_only() {
        let transcript = Transcript {
            original: "a".repeat(1500),
            translated: "b".repeat(1500),
        };
        let preview = transcript.preview();
        assert_eq!(preview.original.len(), 1003);
        assert!(preview.original.ends_with("..."));
        assert_eq!(preview.translated.len(), 1500);
    }
}
