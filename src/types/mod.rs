// Public modules
pub mod chat_session;
pub mod content;
pub mod generate_content_request;
pub mod generate_content_response;
pub mod generation_config;
pub mod ids;
pub mod message;
pub mod model;
pub mod role;

// Re-exports
pub use chat_session::{ChatSession, TITLE_MAX_CHARS, UNTITLED_SESSION, derive_title};
pub use content::{Content, Part};
pub use generate_content_request::GenerateContentRequest;
pub use generate_content_response::{
    Candidate, GenerateContentResponse, PromptFeedback, UsageMetadata,
};
pub use generation_config::GenerationConfig;
pub use ids::{MessageId, SessionId};
pub use message::Message;
pub use model::{KnownModel, Model};
pub use role::Role;
