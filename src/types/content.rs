use serde::{Deserialize, Serialize};

use crate::types::Message;

/// One part of a content entry on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Plain text carried by the part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Set when the part is a model thought summary rather than answer text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }

    /// Returns the answer text of this part, skipping thoughts.
    pub fn answer_text(&self) -> Option<&str> {
        if self.thought == Some(true) {
            None
        } else {
            self.text.as_deref()
        }
    }
}

/// A role-tagged list of parts, the unit of conversation history on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`; absent for system instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The parts of this content entry.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a content entry holding a single text part.
    pub fn new(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated answer text of all parts.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::answer_text).collect()
    }
}

impl From<&Message> for Content {
    /// Strips ids and timestamps and maps the role onto the API vocabulary.
    fn from(message: &Message) -> Self {
        Content::new(Some(message.role.api_role()), message.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn message_maps_to_model_role() {
        let content = Content::from(&Message::assistant("Hi there"));
        assert_eq!(
            to_value(&content).unwrap(),
            json!({"role": "model", "parts": [{"text": "Hi there"}]})
        );
        let content = Content::from(&Message::user("Hello"));
        assert_eq!(content.role.as_deref(), Some("user"));
    }

    #[test]
    fn thoughts_are_not_answer_text() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "planning...", "thought": true},
                {"text": "Hello"},
                {"text": " world"}
            ]
        }))
        .unwrap();
        assert_eq!(content.text(), "Hello world");
    }
}
