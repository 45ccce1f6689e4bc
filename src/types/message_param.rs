use serde::{Deserialize, Serialize};

/// One prior turn sent back to the model with the next request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageParam {
    /// The role of the message.
    pub role: MessageRole,

    /// The text of the turn.
    pub content: String,
}

/// Role type for a message parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl MessageParam {
    /// Create a new `MessageParam` with the given content and role.
    pub fn new(content: impl Into<String>, role: MessageRole) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user `MessageParam`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, MessageRole::User)
    }

    /// Create a new assistant `MessageParam`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, MessageRole::Assistant)
    }
}
