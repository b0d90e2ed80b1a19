//! Clipboard sinks.

use std::io::{self, Write};

use base64::Engine;

/// Somewhere copied text can be sent.  Writes are fire-and-forget.
pub trait Clipboard: Send {
    /// Place `text` on the clipboard.
    fn write_text(&mut self, text: &str);
}

/// Sets the terminal's clipboard with an OSC 52 escape sequence.
///
/// Terminals that do not understand the sequence ignore it.
#[derive(Debug, Default)]
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    /// Create a clipboard writing to stdout.
    pub fn new() -> Self {
        Self
    }

    /// The escape sequence that places `text` on the system clipboard.
    pub fn sequence(text: &str) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        format!("\x1b]52;c;{payload}\x07")
    }
}

impl Clipboard for Osc52Clipboard {
    fn write_text(&mut self, text: &str) {
        let mut stdout = io::stdout();
        let result = stdout
            .write_all(Self::sequence(text).as_bytes())
            .and_then(|_| stdout.flush());
        match result {
            Ok(()) => tracing::debug!(bytes = text.len(), "copied to clipboard"),
            Err(err) => tracing::warn!(error = %err, "could not write clipboard sequence"),
        }
    }
}

/// Records clipboard writes in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    writes: Vec<String>,
}

impl MemoryClipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent write.
    pub fn contents(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }

    /// Every write, oldest first.
    pub fn history(&self) -> &[String] {
        &self.writes
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) {
        self.writes.push(text.to_string());
    }
}
