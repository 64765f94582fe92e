use serde::{Deserialize, Serialize};

/// One turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionMessage {
    /// The role of the message.
    pub role: ChatMessageRole,

    /// The text content of the message.
    pub content: String,
}

/// Role type for a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageRole {
    /// System role; instructions that frame the conversation.
    System,

    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl ChatCompletionMessage {
    /// Create a new `ChatCompletionMessage` with the given role and content.
    pub fn new(role: ChatMessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::Assistant, content)
    }
}

impl std::fmt::Display for ChatMessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatMessageRole::System => write!(f, "system"),
            ChatMessageRole::User => write!(f, "user"),
            ChatMessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn message_serialization() {
        let message = ChatCompletionMessage::user("Hello, world!");
        let json = to_value(&message).unwrap();

        assert_eq!(
            json,
            json!({
                "role": "user",
                "content": "Hello, world!"
            })
        );
    }

    #[test]
    fn role_names() {
        assert_eq!(to_value(ChatMessageRole::System).unwrap(), json!("system"));
        assert_eq!(ChatMessageRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn unknown_role_rejected() {
        let result = serde_json::from_value::<ChatCompletionMessage>(json!({
            "role": "wizard",
            "content": "abracadabra"
        }));
        assert!(result.is_err());
    }
}
