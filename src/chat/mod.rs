//! The interactive chat application.
//!
//! This module provides a streaming REPL chat interface on top of the
//! conversation reducer and session store.  It supports:
//!
//! - Streaming replies with real-time display and Ctrl+C to stop
//! - Saved sessions with history, rename and delete
//! - Regenerate, shorter/longer refinements and prompt editing
//! - Copying messages and code blocks to the clipboard
//! - Markdown insertion into the draft prompt
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the [`Chat`] driver running turns against a source
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P};
pub use session::{Chat, StopHandle, TurnOutcome};
