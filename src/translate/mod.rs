use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;

pub mod google;
pub mod openai;

pub use google::GoogleTranslator;
pub use openai::OpenAiTranslator;

use crate::config::TranslationConfig;
use crate::Result;

/// Returned instead of a translation when there is too little text to translate
pub const INSUFFICIENT_TEXT: &str = "Nu există suficient text.";

/// One item of a streamed translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Incremental piece of the translated text
    Text(String),
    /// The provider finished the response
    Done,
}

/// Incremental translation output, terminated by [`Fragment::Done`]
pub type FragmentStream = BoxStream<'static, Result<Fragment>>;

/// Higher quality provider that streams its answer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamingTranslator: Send + Sync {
    /// Whether a credential is available; unconfigured providers are never called
    fn is_configured(&self) -> bool;

    /// Start translating `text`
    async fn open_stream(&self, text: &str) -> Result<FragmentStream>;
}

/// Best-effort provider used when the primary one is unavailable
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Tries the primary provider, then the fallback, then gives the input back unchanged.
///
/// [`TranslationPolicy::translate`] never fails: every error is logged and degrades to the next tier.
pub struct TranslationPolicy {
    primary: Arc<dyn StreamingTranslator>,
    secondary: Arc<dyn Translator>,
    max_input_chars: usize,
    min_input_chars: usize,
}

impl TranslationPolicy {
    pub fn new(
        primary: Arc<dyn StreamingTranslator>,
        secondary: Arc<dyn Translator>,
        max_input_chars: usize,
        min_input_chars: usize,
    ) -> Self {
        Self {
            primary,
            secondary,
            max_input_chars,
            min_input_chars,
        }
    }

    /// Build the OpenAI + Google policy from configuration
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        let primary = OpenAiTranslator::new(config)?;
        let secondary = GoogleTranslator::new(config)?;

        Ok(Self::new(
            Arc::new(primary),
            Arc::new(secondary),
            config.max_input_chars,
            config.min_input_chars,
        ))
    }

    pub async fn translate(&self, text: &str) -> String {
        if text.chars().count() < self.min_input_chars {
            return INSUFFICIENT_TEXT.to_string();
        }

        if !self.primary.is_configured() {
            tracing::debug!("Primary translator not configured, using fallback");
            return self.fallback(text).await;
        }

        let input = crate::utils::truncate_chars(text, self.max_input_chars);
        match self.translate_primary(input).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!("Primary translation failed, using fallback: {:#}", e);
                self.fallback(text).await
            }
        }
    }

    /// Drain the primary stream into one string
    async fn translate_primary(&self, text: &str) -> Result<String> {
        let mut stream = self.primary.open_stream(text).await?;
        let mut translated = String::new();

        while let Some(fragment) = stream.next().await {
            match fragment? {
                Fragment::Text(piece) => {
                    tracing::trace!("Translation chunk: {}", piece);
                    translated.push_str(&piece);
                }
                Fragment::Done => break,
            }
        }

        let translated = translated.trim();
        if translated.is_empty() {
            anyhow::bail!(crate::BridgeError::TranslationFailed(
                "primary provider returned no text".to_string()
            ));
        }

        Ok(translated.to_string())
    }

    async fn fallback(&self, text: &str) -> String {
        match self.secondary.translate(text).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!("Fallback translation failed, returning original text: {:#}", e);
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    const LONG_TEXT: &str = "This is a transcript long enough to translate.";

    fn fragments(items: Vec<Result<Fragment>>) -> FragmentStream {
        stream::iter(items).boxed()
    }

    fn policy(primary: MockStreamingTranslator, secondary: MockTranslator) -> TranslationPolicy {
        TranslationPolicy::new(Arc::new(primary), Arc::new(secondary), 3000, 5)
    }

    #[tokio::test]
    async fn test_short_text_returns_sentinel() {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().times(0);
        primary.expect_open_stream().times(0);
        let mut secondary = MockTranslator::new();
        secondary.expect_translate().times(0);

        let policy = policy(primary, secondary);
        assert_eq!(policy.translate("").await, INSUFFICIENT_TEXT);
        assert_eq!(policy.translate("abcd").await, INSUFFICIENT_TEXT);
    }

    #[tokio::test]
    async fn test_unconfigured_primary_is_never_called() {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(false);
        primary.expect_open_stream().times(0);
        let mut secondary = MockTranslator::new();
        secondary
            .expect_translate()
            .times(1)
            .returning(|_| Ok("tradus".to_string()));

        assert_eq!(policy(primary, secondary).translate(LONG_TEXT).await, "tradus");
    }

    #[tokio::test]
    async fn test_primary_chunks_are_accumulated() {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(true);
        primary.expect_open_stream().times(1).returning(|_| {
            Ok(fragments(vec![
                Ok(Fragment::Text("Acesta ".to_string())),
                Ok(Fragment::Text("este ".to_string())),
                Ok(Fragment::Text("un test.".to_string())),
                Ok(Fragment::Done),
                Ok(Fragment::Text(" ignored".to_string())),
            ]))
        });
        let mut secondary = MockTranslator::new();
        secondary.expect_translate().times(0);

        assert_eq!(policy(primary, secondary).translate(LONG_TEXT).await, "Acesta este un test.");
    }

    #[tokio::test]
    async fn test_primary_input_is_truncated() {
        let long = "ă".repeat(5000);
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(true);
        primary
            .expect_open_stream()
            .withf(|text: &str| text.chars().count() == 3000)
            .times(1)
            .returning(|_| Ok(fragments(vec![Ok(Fragment::Text("ok".to_string())), Ok(Fragment::Done)])));
        let mut secondary = MockTranslator::new();
        secondary.expect_translate().times(0);

        assert_eq!(policy(primary, secondary).translate(&long).await, "ok");
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_with_original_text() {
        let long = "word ".repeat(1000);
        let expected_input = long.clone();

        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(true);
        primary
            .expect_open_stream()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("HTTP 500")));
        let mut secondary = MockTranslator::new();
        secondary
            .expect_translate()
            .withf(move |text: &str| text == expected_input)
            .times(1)
            .returning(|text| Ok(format!("fallback:{}", text.len())));

        assert_eq!(policy(primary, secondary).translate(&long).await, "fallback:5000");
    }

    #[tokio::test]
    async fn test_stream_error_falls_back() {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(true);
        primary.expect_open_stream().returning(|_| {
            Ok(fragments(vec![
                Ok(Fragment::Text("partial".to_string())),
                Err(anyhow::anyhow!("connection reset")),
            ]))
        });
        let mut secondary = MockTranslator::new();
        secondary
            .expect_translate()
            .times(1)
            .returning(|_| Ok("din rezervă".to_string()));

        assert_eq!(policy(primary, secondary).translate(LONG_TEXT).await, "din rezervă");
    }

    #[tokio::test]
    async fn test_empty_primary_answer_falls_back() {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(true);
        primary
            .expect_open_stream()
            .returning(|_| Ok(fragments(vec![Ok(Fragment::Done)])));
        let mut secondary = MockTranslator::new();
        secondary
            .expect_translate()
            .times(1)
            .returning(|_| Ok("rezervă".to_string()));

        assert_eq!(policy(primary, secondary).translate(LONG_TEXT).await, "rezervă");
    }

    #[tokio::test]
    async fn test_both_failing_returns_input_unchanged() {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(true);
        primary
            .expect_open_stream()
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        let mut secondary = MockTranslator::new();
        secondary
            .expect_translate()
            .returning(|_| Err(anyhow::anyhow!("rate limited")));

        assert_eq!(policy(primary, secondary).translate(LONG_TEXT).await, LONG_TEXT);
    }

    #[tokio::test]
    async fn test_unconfigured_and_fallback_failing_returns_input() {
        let mut primary = MockStreamingTranslator::new();
        primary.expect_is_configured().return_const(false);
        primary.expect_open_stream().times(0);
        let mut secondary = MockTranslator::new();
        secondary
            .expect_translate()
            .returning(|_| Err(anyhow::anyhow!("offline")));

        assert_eq!(policy(primary, secondary).translate(LONG_TEXT).await, LONG_TEXT);
    }
}
