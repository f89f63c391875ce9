//! The seam between the chat pipeline and the Ollama server.
//!
//! [`ChatBackend`] has two operations: list the installed models and open a
//! streaming chat. [`OllamaBackend`] implements them over HTTP; tests swap
//! in a scripted in-memory backend.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use memchr::memchr;
use tracing::{debug, warn};

use crate::api::models::fetch_models;
use crate::api::{ChatChunk, ChatRequest};
use crate::utils::url::construct_api_url;

/// Stream of decoded chat chunks. An `Err` item ends the stream.
pub type ChunkStream = BoxStream<'static, Result<ChatChunk, BackendError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The server could not be reached at all.
    Connect(String),
    /// The server answered with a non-success status.
    Status { status: u16, message: String },
    /// A response body or stream line was not valid JSON for the expected shape.
    Decode(String),
    /// The byte stream broke after the response started.
    Stream(String),
    /// The server reported an error inside the stream.
    Remote(String),
}

impl BackendError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            BackendError::Connect(err.to_string())
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Connect(msg) => write!(f, "Could not connect to Ollama: {msg}"),
            BackendError::Status { status, message } => {
                write!(f, "Ollama returned status {status}: {message}")
            }
            BackendError::Decode(msg) => write!(f, "Unexpected response from Ollama: {msg}"),
            BackendError::Stream(msg) => write!(f, "Response stream interrupted: {msg}"),
            BackendError::Remote(msg) => write!(f, "Ollama error: {msg}"),
        }
    }
}

impl Error for BackendError {}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Names of the models installed on the server, in server order.
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;

    /// Opens a streaming chat. Errors here mean the request never started;
    /// failures after that arrive as `Err` items on the stream.
    async fn chat(&self, request: ChatRequest) -> Result<ChunkStream, BackendError>;
}

#[derive(Clone, Debug)]
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let tags = fetch_models(&self.client, &self.base_url).await?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChunkStream, BackendError> {
        let chat_url = construct_api_url(&self.base_url, "api/chat");
        debug!(
            url = %chat_url,
            model = %request.model,
            messages = request.messages.len(),
            temperature = request.options.temperature,
            "Opening chat stream"
        );

        let response = self
            .client
            .post(chat_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: format_api_error(&error_text),
            });
        }

        Ok(decode_ndjson_stream(response.bytes_stream()))
    }
}

/// Turns a byte stream of newline-delimited JSON into chat chunks.
pub fn decode_ndjson_stream<S, B, E>(bytes: S) -> ChunkStream
where
    S: futures_util::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let bytes = Box::pin(bytes);
    let stream = stream::unfold(
        (bytes, NdjsonDecoder::default(), VecDeque::new(), false),
        |(mut bytes, mut decoder, mut pending, mut finished)| async move {
            loop {
                if let Some(item) = pending.pop_front() {
                    return Some((item, (bytes, decoder, pending, finished)));
                }
                if finished {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.push(chunk.as_ref())),
                    Some(Err(err)) => {
                        finished = true;
                        pending.push_back(Err(BackendError::Stream(err.to_string())));
                    }
                    None => {
                        finished = true;
                        pending.extend(decoder.finish());
                    }
                }
            }
        },
    );
    // Stop after the first error.
    let mut failed = false;
    stream
        .take_while(move |item| {
            let keep = !failed;
            failed |= item.is_err();
            futures_util::future::ready(keep)
        })
        .boxed()
}

/// Incremental line splitter for NDJSON bodies. Bytes are buffered until a
/// newline arrives, so chunk boundaries may fall anywhere, including inside
/// a multi-byte character.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<ChatChunk, BackendError>> {
        self.buffer.extend_from_slice(bytes);
        let mut items = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(item) = decode_line(&line[..newline_pos]) {
                items.push(item);
            }
        }
        items
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<Result<ChatChunk, BackendError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Option<Result<ChatChunk, BackendError>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(err) => {
            warn!(error = %err, "Invalid UTF-8 line in chat stream");
            return Some(Err(BackendError::Decode(format!(
                "invalid UTF-8 in stream line: {err}"
            ))));
        }
    };
    if text.is_empty() {
        return None;
    }

    match serde_json::from_str::<ChatChunk>(text) {
        Ok(chunk) => match &chunk.error {
            Some(message) => Some(Err(BackendError::Remote(message.clone()))),
            None => Some(Ok(chunk)),
        },
        Err(err) => Some(Err(BackendError::Decode(format!(
            "{err}: {}",
            format_api_error(text)
        )))),
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .get("error")
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.to_string()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|message| message.as_str().map(str::to_owned)),
            _ => None,
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Reduces an error body to a single readable line. Ollama reports errors
/// as `{"error": "..."}`; anything else is passed through collapsed.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value).filter(|s| !s.is_empty()) {
            return summary;
        }
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[Result<ChatChunk, BackendError>]) -> Vec<Option<String>> {
        items
            .iter()
            .map(|item| {
                item.as_ref()
                    .ok()
                    .and_then(|chunk| chunk.text().map(str::to_string))
            })
            .collect()
    }

    #[test]
    fn decoder_handles_lines_split_across_reads() {
        let mut decoder = NdjsonDecoder::default();
        let first = decoder.push(br#"{"message":{"role":"assistant","content":"Hel"},"done":false}
{"message":{"role":"assis"#);
        assert_eq!(texts(&first), vec![Some("Hel".to_string())]);

        let second = decoder.push(
            br#"tant","content":"lo"},"done":false}
"#,
        );
        assert_eq!(texts(&second), vec![Some("lo".to_string())]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decoder_keeps_multibyte_characters_split_between_reads() {
        let line = "{\"message\":{\"content\":\"caf\u{e9}\"}}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).expect("utf-8 lead byte") + 1;

        let mut decoder = NdjsonDecoder::default();
        assert!(decoder.push(&line[..split]).is_empty());
        let items = decoder.push(&line[split..]);
        assert_eq!(texts(&items), vec![Some("café".to_string())]);
    }

    #[test]
    fn decoder_skips_blank_lines_and_flushes_trailing_line() {
        let mut decoder = NdjsonDecoder::default();
        let items = decoder.push(b"\n\r\n   \n{\"done\":true");
        assert!(items.is_empty());
        let last = decoder.finish().expect("trailing line");
        assert!(last.expect("chunk").done);
    }

    #[test]
    fn decoder_reports_server_error_lines() {
        let mut decoder = NdjsonDecoder::default();
        let items = decoder.push(b"{\"error\":\"model runner has unexpectedly stopped\"}\n");
        assert_eq!(
            items,
            vec![Err(BackendError::Remote(
                "model runner has unexpectedly stopped".to_string()
            ))]
        );
    }

    #[test]
    fn decoder_reports_malformed_json() {
        let mut decoder = NdjsonDecoder::default();
        let items = decoder.push(b"not json\n");
        assert!(matches!(items.as_slice(), [Err(BackendError::Decode(_))]));
    }

    #[test]
    fn decoder_reports_invalid_utf8_lines() {
        let mut decoder = NdjsonDecoder::default();
        let mut body = b"{\"message\":{\"content\":\"ok\"}}\n".to_vec();
        body.extend_from_slice(b"{\"message\":{\"content\":\"\xff\xfe\"}}\n");
        let items = decoder.push(&body);
        assert_eq!(texts(&items), vec![Some("ok".to_string()), None]);
        assert!(matches!(items[1], Err(BackendError::Decode(ref msg)) if msg.contains("UTF-8")));
    }

    #[tokio::test]
    async fn ndjson_stream_ends_after_first_error() {
        let reads: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"{\"message\":{\"content\":\"Par\"}}\n".to_vec()),
            Ok(b"{\"message\":{\"content\":\"tial\"}}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"{\"message\":{\"content\":\"never\"}}\n".to_vec()),
        ];
        let items: Vec<_> = decode_ndjson_stream(stream::iter(reads)).collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(
            texts(&items[..2]),
            vec![Some("Par".to_string()), Some("tial".to_string())]
        );
        assert_eq!(
            items[2],
            Err(BackendError::Stream("connection reset".to_string()))
        );
    }

    #[test]
    fn format_api_error_prefers_error_field() {
        assert_eq!(
            format_api_error(r#"{"error":"model 'llama9' not found"}"#),
            "model 'llama9' not found"
        );
        assert_eq!(
            format_api_error(r#"{"error":{"message":"too   many\nrequests"}}"#),
            "too many requests"
        );
        assert_eq!(format_api_error("  \n"), "<empty>");
        assert_eq!(format_api_error("Bad\n Gateway"), "Bad Gateway");
    }
}
