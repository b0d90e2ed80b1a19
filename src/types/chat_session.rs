use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Message, SessionId};

/// Maximum number of characters kept from the first prompt in a title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Title used when a conversation has no user message.
pub const UNTITLED_SESSION: &str = "Untitled Session";

/// A saved conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Stable identifier of the session.
    pub id: SessionId,

    /// Display title, derived once from the first prompt or set by rename.
    pub title: String,

    /// The conversation, oldest first.
    pub messages: Vec<Message>,

    /// When the session was last written.
    #[serde(with = "crate::utils::time")]
    pub updated_at: OffsetDateTime,
}

impl ChatSession {
    /// Number of messages written by the user.
    pub fn prompt_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }
}

/// Derive a session title from a conversation.
///
/// The title is the first user message cut to [`TITLE_MAX_CHARS`]
/// characters with `...` appended when it was cut.  Conversations without a
/// user message are titled [`UNTITLED_SESSION`].
pub fn derive_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|m| m.is_user()) else {
        return UNTITLED_SESSION.to_string();
    };
    let content = first.content.as_str();
    match content.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prompt_is_title() {
        let messages = vec![Message::assistant("Greetings."), Message::user("Hello")];
        assert_eq!(derive_title(&messages), "Hello");
    }

    #[test]
    fn long_prompt_is_truncated() {
        let prompt = "abcdefghijklmnopqrstuvwxyz0123456789ABCD";
        assert_eq!(prompt.chars().count(), 40);
        let title = derive_title(&[Message::user(prompt)]);
        assert_eq!(title, "abcdefghijklmnopqrstuvwxyz0123...");
    }

    #[test]
    fn exactly_thirty_chars_is_not_truncated() {
        let prompt = "x".repeat(30);
        assert_eq!(derive_title(&[Message::user(prompt.clone())]), prompt);
    }

    #[test]
    fn multibyte_prompt_truncates_on_char_boundary() {
        let prompt = "é".repeat(31);
        assert_eq!(derive_title(&[Message::user(prompt)]), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn no_user_message_is_untitled() {
        assert_eq!(derive_title(&[Message::assistant("hi")]), UNTITLED_SESSION);
        assert_eq!(derive_title(&[]), UNTITLED_SESSION);
    }

    #[test]
    fn serializes_camel_case() {
        let session = ChatSession {
            id: SessionId::from("s1"),
            title: "Hello".to_string(),
            messages: Vec::new(),
            updated_at: time::macros::datetime!(2025-01-02 03:04:05 UTC),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["updatedAt"], "2025-01-02T03:04:05Z");
        assert_eq!(value["title"], "Hello");
    }
}
