use std::fmt;

use serde::{Deserialize, Serialize};

/// The author of a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the person at the keyboard.
    User,

    /// Text produced by the model.
    Assistant,

    /// Instructions injected by the client.
    System,
}

impl Role {
    /// The role name the generation API expects for this author.
    ///
    /// The API only knows `user` and `model`; everything that is not an
    /// assistant turn is sent as `user`.
    pub fn api_role(self) -> &'static str {
        match self {
            Role::Assistant => "model",
            Role::User | Role::System => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
            Role::System => f.write_str("system"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_role_mapping() {
        assert_eq!(Role::Assistant.api_role(), "model");
        assert_eq!(Role::User.api_role(), "user");
        assert_eq!(Role::System.api_role(), "user");
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
        let role: Role = serde_json::from_str(r#""system""#).unwrap();
        assert_eq!(role, Role::System);
    }
}
