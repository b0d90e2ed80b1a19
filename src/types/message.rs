use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{MessageId, Role};
use crate::utils::time::now_millis;

/// One entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier of the message.
    pub id: MessageId,

    /// Who wrote the message.
    pub role: Role,

    /// The message text.  Assistant placeholders start empty and are
    /// replaced while a response streams in.
    pub content: String,

    /// When the message was created, at millisecond precision.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
}

impl Message {
    /// Create a new message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create the empty assistant message that a response streams into.
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }

    /// Returns true if this message was written by the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns true if this message was written by the model.
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn message_serialization() {
        let message = Message {
            id: MessageId::from("42"),
            role: Role::User,
            content: "Hello".to_string(),
            timestamp: time::macros::datetime!(2025-01-02 03:04:05.678 UTC),
        };
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "id": "42",
                "role": "user",
                "content": "Hello",
                "timestamp": "2025-01-02T03:04:05.678Z"
            })
        );
    }

    #[test]
    fn placeholder_is_empty_assistant() {
        let message = Message::placeholder();
        assert!(message.is_assistant());
        assert!(message.content.is_empty());
    }
}
