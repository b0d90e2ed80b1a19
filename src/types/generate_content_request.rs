use serde::{Deserialize, Serialize};

use crate::types::{Content, GenerationConfig, Message};

/// Body of a `streamGenerateContent` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation history, oldest first.
    pub contents: Vec<Content>,

    /// Persona instruction applied to every turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Sampling parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Build a request from chat history.
    pub fn from_history(history: &[Message]) -> Self {
        Self {
            contents: history.iter().map(Content::from).collect(),
            system_instruction: None,
            generation_config: None,
        }
    }

    /// Set the system instruction.
    pub fn with_system_instruction(mut self, instruction: Option<&str>) -> Self {
        self.system_instruction = instruction.map(|text| Content::new(None, text));
        self
    }

    /// Set the generation config.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn request_serialization() {
        let history = vec![
            Message::assistant("Greetings."),
            Message::user("Hello"),
        ];
        let request = GenerateContentRequest::from_history(&history)
            .with_system_instruction(Some("Be terse."))
            .with_generation_config(GenerationConfig {
                temperature: Some(0.7),
                ..Default::default()
            });
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "contents": [
                    {"role": "model", "parts": [{"text": "Greetings."}]},
                    {"role": "user", "parts": [{"text": "Hello"}]}
                ],
                "systemInstruction": {"parts": [{"text": "Be terse."}]},
                "generationConfig": {"temperature": 0.7}
            })
        );
    }
}
