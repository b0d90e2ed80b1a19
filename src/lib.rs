//! A streaming terminal chat client for the Gemini API.
//!
//! The crate is layered bottom-up: [`client`] and [`sse`] speak the
//! streaming wire protocol, [`stream`] turns it into cancellable text
//! fragments, [`conversation`] folds fragments into the message list, and
//! [`store`] persists finished conversations.  [`chat`] drives all of it
//! from the `g9-chat` REPL.

// Public modules
pub mod chat;
pub mod client;
pub mod clipboard;
pub mod conversation;
pub mod error;
pub mod input;
pub mod markdown;
pub mod render;
pub mod sse;
pub mod store;
pub mod stream;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use client::Gemini;
pub use clipboard::{Clipboard, MemoryClipboard, Osc52Clipboard};
pub use conversation::{Conversation, ERROR_MARKER, GREETING, Phase, Refinement, Turn};
pub use error::{Error, Result};
pub use input::{InputBuffer, MarkdownPreset};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use store::{FileStore, KeyValueStore, MemoryStore, SESSIONS_KEY, SessionStore};
pub use stream::{FragmentSource, FragmentStream, GeminiSource, GenerationParams};
pub use types::*;
