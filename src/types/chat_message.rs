use serde::{Deserialize, Serialize};

use crate::types::ChatRole;

/// One entry of the conversation transcript.
///
/// Messages are immutable once created; the transcript only ever grows by
/// appending new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: ChatRole,
    content: String,
}

impl ChatMessage {
    /// Create a new message with the given role and content.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// The author of this message.
    pub fn role(&self) -> ChatRole {
        self.role
    }

    /// The text of this message.
    pub fn content(&self) -> &str {
        &self.content
    }
}
