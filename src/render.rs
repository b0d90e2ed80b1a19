//! Output rendering for the chat REPL.
//!
//! Streaming output goes through the [`Renderer`] trait so the driver can be
//! exercised without a terminal.  Transcript helpers format whole messages.

use std::io::{self, Stdout, Write};

use time::{OffsetDateTime, UtcOffset};

use crate::markdown::render_markdown;
use crate::types::{Message, Role};

/// ANSI escape code for dim text.
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for the assistant label.
const ANSI_GOLD: &str = "\x1b[38;5;178m";

/// ANSI escape code for the user label.
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for errors.
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a newly merged fragment of the reply.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply has streamed to completion.
    fn finish_response(&mut self);

    /// Called when the reply was stopped by the user.
    fn print_interrupted(&mut self) {}
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    line_start: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            line_start: true,
        }
    }

    /// Whether ANSI styling is enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.stdout.write_all(text.as_bytes());
        self.line_start = text.ends_with('\n');
        self.flush();
    }

    fn newline_if_needed(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        self.write(text);
    }

    fn print_error(&mut self, error: &str) {
        self.newline_if_needed();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.newline_if_needed();
        self.write(&format!("{info}\n"));
    }

    fn finish_response(&mut self) {
        self.write("\n");
    }

    fn print_interrupted(&mut self) {
        self.newline_if_needed();
        if self.use_color {
            self.write(&format!("{ANSI_DIM}[interrupted]{ANSI_RESET}\n"));
        } else {
            self.write("[interrupted]\n");
        }
    }
}

/// The local UTC offset, or UTC when it cannot be determined.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Format `timestamp` as `HH:MM` in `offset`.
pub fn format_clock(timestamp: OffsetDateTime, offset: UtcOffset) -> String {
    let format = time::macros::format_description!("[hour]:[minute]");
    timestamp
        .to_offset(offset)
        .format(&format)
        .unwrap_or_default()
}

/// Format a message for the transcript: a header with its number, role and
/// time, then its body.  Assistant bodies are rendered from markdown.
pub fn format_message(index: usize, message: &Message, offset: UtcOffset, use_color: bool) -> String {
    let (label, color) = match message.role {
        Role::User => ("You", ANSI_CYAN),
        Role::Assistant => ("G9", ANSI_GOLD),
        Role::System => ("System", ANSI_DIM),
    };
    let clock = format_clock(message.timestamp, offset);
    let header = if use_color {
        format!("{color}[{index}] {label}{ANSI_RESET} {ANSI_DIM}{clock}{ANSI_RESET}")
    } else {
        format!("[{index}] {label} {clock}")
    };
    let body = match message.role {
        Role::Assistant => render_markdown(&message.content, use_color),
        _ => message.content.clone(),
    };
    format!("{header}\n{body}\n")
}

/// Format a whole conversation, numbering messages from 1.
pub fn format_transcript(messages: &[Message], offset: UtcOffset, use_color: bool) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| format_message(i + 1, m, offset, use_color))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color());
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color());
    }

    #[test]
    fn clock_uses_offset() {
        let ts = datetime!(2025-03-04 13:07:59.500 UTC);
        assert_eq!(format_clock(ts, UtcOffset::UTC), "13:07");
        assert_eq!(format_clock(ts, offset!(+2)), "15:07");
    }

    #[test]
    fn transcript_numbers_and_labels_messages() {
        let mut user = Message::user("What is `Box`?");
        user.timestamp = datetime!(2025-03-04 09:05 UTC);
        let mut reply = Message::assistant("A **heap** pointer.");
        reply.timestamp = datetime!(2025-03-04 09:06 UTC);
        let out = format_transcript(&[user, reply], UtcOffset::UTC, false);
        assert_eq!(
            out,
            "[1] You 09:05\nWhat is `Box`?\n\n[2] G9 09:06\nA heap pointer.\n"
        );
    }
}
