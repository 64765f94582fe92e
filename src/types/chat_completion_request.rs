use serde::{Deserialize, Serialize};

use crate::types::ChatCompletionMessage;

/// A chat completion request.
///
/// This is both the payload sent to the chat completions endpoint and the record persisted in
/// the session file, so a continued session replays exactly what was sent last time plus the
/// assistant's reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// The model identifier.
    pub model: String,

    /// The conversation so far, in turn order.
    pub messages: Vec<ChatCompletionMessage>,

    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Whether the response is streamed as server-sent events.
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Create a new streaming request for `model` with no messages.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_tokens: None,
            temperature: None,
            stream: true,
        }
    }

    /// Set the maximum number of tokens to generate; `None` leaves it to the server.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Append a message to the conversation.
    pub fn push(&mut self, message: ChatCompletionMessage) {
        self.messages.push(message);
    }

    /// The last message of the conversation, if any.
    pub fn last_message(&self) -> Option<&ChatCompletionMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessageRole;
    use serde_json::{json, to_value};

    #[test]
    fn request_omits_unset_parameters() {
        let mut request = ChatCompletionRequest::new("gpt-3.5-turbo");
        request.push(ChatCompletionMessage::user("hi"));

        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn request_with_parameters() {
        let request = ChatCompletionRequest::new("gpt-4")
            .with_max_tokens(Some(500))
            .with_temperature(Some(0.5));

        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "gpt-4",
                "messages": [],
                "max_tokens": 500,
                "temperature": 0.5,
                "stream": true
            })
        );
    }

    #[test]
    fn request_accepts_foreign_session_fields() {
        // Session files written by other clients carry extra fields; they are ignored.
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "be terse"},
                {"role": "user", "content": "hello"},
                {"role": "assistant", "content": "hi"}
            ],
            "max_tokens": 500,
            "stream": true,
            "top_p": 0,
            "n": 0
        }))
        .unwrap();

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, ChatMessageRole::System);
        assert_eq!(request.max_tokens, Some(500));
        assert_eq!(request.temperature, None);
        assert_eq!(request.last_message().map(|m| m.content.as_str()), Some("hi"));
    }
}
