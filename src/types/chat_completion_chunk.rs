use serde::{Deserialize, Serialize};

use crate::types::ChatMessageRole;

/// One decoded event of a streamed chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    /// Completion identifier shared by every chunk of one response.
    #[serde(default)]
    pub id: String,

    /// The model that produced the chunk.
    #[serde(default)]
    pub model: String,

    /// Per-choice deltas.  Azure sends a leading chunk with no choices at all.
    #[serde(default)]
    pub choices: Vec<ChatCompletionChunkChoice>,
}

/// A single choice within a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunkChoice {
    /// Index of the choice.
    #[serde(default)]
    pub index: u32,

    /// The incremental update.
    #[serde(default)]
    pub delta: ChatCompletionDelta,

    /// Why generation stopped, on the final chunk of a choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The incremental part of a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionDelta {
    /// Set on the first chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatMessageRole>,

    /// The text fragment, if this chunk carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Build a chunk carrying a single text fragment.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatCompletionChunkChoice {
                delta: ChatCompletionDelta {
                    role: None,
                    content: Some(content.into()),
                },
                ..ChatCompletionChunkChoice::default()
            }],
            ..ChatCompletionChunk::default()
        }
    }

    /// The text fragment of the first choice.
    pub fn fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// The finish reason of the first choice.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_deserialization() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "created": 1694268190,
            "model": "gpt-3.5-turbo-0613",
            "choices": [{"index": 0, "delta": {"content": "Hello"}, "finish_reason": null}]
        }))
        .unwrap();

        assert_eq!(chunk.id, "chatcmpl-123");
        assert_eq!(chunk.fragment(), Some("Hello"));
        assert_eq!(chunk.finish_reason(), None);
    }

    #[test]
    fn role_only_chunk_has_no_fragment() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-123",
            "choices": [{"index": 0, "delta": {"role": "assistant"}}]
        }))
        .unwrap();

        assert_eq!(chunk.choices[0].delta.role, Some(ChatMessageRole::Assistant));
        assert_eq!(chunk.fragment(), None);
    }

    #[test]
    fn azure_filter_preamble_has_no_choices() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "",
            "object": "",
            "created": 0,
            "model": "",
            "prompt_filter_results": [{"prompt_index": 0, "content_filter_results": {}}],
            "choices": []
        }))
        .unwrap();

        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.fragment(), None);
    }

    #[test]
    fn final_chunk_finish_reason() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
        }))
        .unwrap();

        assert_eq!(chunk.finish_reason(), Some("stop"));
        assert_eq!(chunk.fragment(), None);
    }
}
