//! Ollama wire payloads for `/api/chat` and `/api/tags`.

pub mod models;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Sampling options. Temperature is the only option the client sends.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChunkMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// One newline-delimited JSON object from a streaming `/api/chat` response.
///
/// Every field is optional: chunks that carry no text (tool-call markers,
/// the final statistics line) deserialize cleanly and are skipped by the
/// accumulator.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatChunk {
    /// The text delta carried by this chunk, if any.
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|message| message.content.as_deref())
            .filter(|content| !content.is_empty())
    }

    #[cfg(test)]
    pub fn fragment(text: &str) -> Self {
        Self {
            message: Some(ChunkMessage {
                role: Some("assistant".to_string()),
                content: Some(text.to_string()),
            }),
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ModelDetails {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
    #[serde(default)]
    pub quantization_level: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_temperature_as_only_option() {
        let request = ChatRequest {
            model: "llama3.2:latest".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            stream: true,
            options: ChatOptions { temperature: 0.5 },
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["stream"], serde_json::json!(true));
        assert_eq!(value["options"], serde_json::json!({ "temperature": 0.5 }));
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn chunk_without_message_has_no_text() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"model":"m","done":true,"done_reason":"stop"}"#)
                .expect("parse");
        assert!(chunk.done);
        assert_eq!(chunk.text(), None);
    }

    #[test]
    fn chunk_with_tool_calls_and_empty_content_has_no_text() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"x"}}]},"done":false}"#,
        )
        .expect("parse");
        assert_eq!(chunk.text(), None);
    }

    #[test]
    fn tags_response_tolerates_missing_optional_fields() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"llama3.2:latest"},{"name":"qwen2.5:7b","size":4683087332,"details":{"family":"qwen2"}}]}"#,
        )
        .expect("parse");
        assert_eq!(tags.models.len(), 2);
        assert_eq!(tags.models[1].size, Some(4683087332));
        assert_eq!(
            tags.models[1]
                .details
                .as_ref()
                .and_then(|d| d.family.as_deref()),
            Some("qwen2")
        );
    }
}
