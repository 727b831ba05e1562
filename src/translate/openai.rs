use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use futures_util::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::{Fragment, FragmentStream, StreamingTranslator};
use crate::config::TranslationConfig;
use crate::{BridgeError, Result};

const DONE_MARKER: &str = "[DONE]";

/// Chat-completion translator speaking the OpenAI streaming protocol
#[derive(Debug, Clone)]
pub struct OpenAiTranslator {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    system_prompt: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl OpenAiTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone().filter(|key| !key.trim().is_empty()),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
        })
    }
}

#[async_trait]
impl StreamingTranslator for OpenAiTranslator {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn open_stream(&self, text: &str) -> Result<FragmentStream> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BridgeError::TranslationFailed("OpenAI API key not configured".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.temperature,
            stream: true,
        };

        tracing::debug!("Requesting translation of {} chars from {}", text.chars().count(), self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(BridgeError::TranslationFailed(format!(
                "OpenAI returned HTTP {}: {}",
                status,
                crate::utils::truncate_chars(body.trim(), 200)
            )));
        }

        Ok(parse_event_stream(Box::pin(response.bytes_stream())))
    }
}

struct EventStreamState<S> {
    bytes: S,
    buffer: Vec<u8>,
    pending: VecDeque<Fragment>,
    finished: bool,
}

impl<S> EventStreamState<S> {
    /// Move every complete line out of the buffer
    fn drain_lines(&mut self) {
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.handle_line(&line);
            if self.finished {
                self.buffer.clear();
                return;
            }
        }
    }

    fn handle_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        match parse_event_line(&line) {
            Some(Fragment::Done) => {
                self.pending.push_back(Fragment::Done);
                self.finished = true;
            }
            Some(fragment) => self.pending.push_back(fragment),
            None => {}
        }
    }
}

/// Interpret one server-sent-events line.
///
/// Comments, non-data fields and malformed payloads yield `None`.
pub fn parse_event_line(line: &str) -> Option<Fragment> {
    let payload = line.trim().strip_prefix("data:")?.trim();
    if payload == DONE_MARKER {
        return Some(Fragment::Done);
    }

    let chunk: ChatChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!("Skipping malformed stream fragment: {}", e);
            return None;
        }
    };

    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(Fragment::Text(text))
    }
}

/// Turn a `text/event-stream` body into translation fragments
pub fn parse_event_stream<S, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = EventStreamState {
        bytes,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(anyhow::Error::new(e).context("translation stream interrupted")), state));
                }
                None => {
                    state.finished = true;
                    if !state.buffer.is_empty() {
                        let rest = std::mem::take(&mut state.buffer);
                        state.handle_line(&rest);
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(chunks: Vec<&'static str>) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))))
    }

    async fn collect(stream: FragmentStream) -> Vec<Fragment> {
        stream
            .map(|item| item.expect("fragment"))
            .collect::<Vec<_>>()
            .await
    }

    #[test]
    fn test_parse_event_line() {
        assert_eq!(
            parse_event_line(r#"data: {"choices":[{"delta":{"content":"Salut"}}]}"#),
            Some(Fragment::Text("Salut".to_string()))
        );
        assert_eq!(parse_event_line("data: [DONE]"), Some(Fragment::Done));
        assert_eq!(parse_event_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#), None);
        assert_eq!(parse_event_line("data: {not json"), None);
        assert_eq!(parse_event_line(": keep-alive"), None);
        assert_eq!(parse_event_line(""), None);
    }

    #[tokio::test]
    async fn test_stream_split_across_chunks() {
        let stream = parse_event_stream(body(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Bun",
            "ă \"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ziua\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]));

        assert_eq!(
            collect(stream).await,
            vec![
                Fragment::Text("Bună ".to_string()),
                Fragment::Text("ziua".to_string()),
                Fragment::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_multibyte_char_split_between_chunks() {
        // "ă" is 0xC4 0x83 in UTF-8
        let first: &'static [u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"\xC4";
        let second: &'static [u8] = b"\x83\"}}]}\n";
        let stream = parse_event_stream(stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(first)),
            Ok(Bytes::from_static(second)),
        ]));

        assert_eq!(collect(stream).await, vec![Fragment::Text("ă".to_string())]);
    }

    #[tokio::test]
    async fn test_malformed_fragments_are_skipped() {
        let stream = parse_event_stream(body(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: garbage\n",
            "event: ping\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
            "data: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"after\"}}]}\n",
        ]));

        assert_eq!(
            collect(stream).await,
            vec![
                Fragment::Text("a".to_string()),
                Fragment::Text("b".to_string()),
                Fragment::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let stream = parse_event_stream(body(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"]));
        assert_eq!(collect(stream).await, vec![Fragment::Text("end".to_string())]);
    }

    #[tokio::test]
    async fn test_transport_error_is_surfaced() {
        let stream = parse_event_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]));

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_translator() {
        let translator = OpenAiTranslator::new(&TranslationConfig::default()).unwrap();
        assert!(!translator.is_configured());
        assert!(translator.open_stream("hello there").await.is_err());

        let config = TranslationConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..TranslationConfig::default()
        };
        assert!(OpenAiTranslator::new(&config).unwrap().is_configured());
    }
}
