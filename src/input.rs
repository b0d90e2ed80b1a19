//! The editable prompt buffer.

use std::ops::Range;

/// A markdown snippet that wraps the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownPreset {
    /// `**bold**`
    Bold,
    /// `_italic_`
    Italic,
    /// `` `code` ``
    Code,
    /// A fenced code block.
    CodeBlock,
    /// `[text](url)`
    Link,
    /// A bullet list item.
    List,
}

impl MarkdownPreset {
    /// The text inserted before the selection.
    pub fn prefix(self) -> &'static str {
        match self {
            MarkdownPreset::Bold => "**",
            MarkdownPreset::Italic => "_",
            MarkdownPreset::Code => "`",
            MarkdownPreset::CodeBlock => "```\n",
            MarkdownPreset::Link => "[",
            MarkdownPreset::List => "\n- ",
        }
    }

    /// The text inserted after the selection.
    pub fn suffix(self) -> &'static str {
        match self {
            MarkdownPreset::Bold => "**",
            MarkdownPreset::Italic => "_",
            MarkdownPreset::Code => "`",
            MarkdownPreset::CodeBlock => "\n```",
            MarkdownPreset::Link => "](url)",
            MarkdownPreset::List => "",
        }
    }
}

/// Prompt text plus a selection, as a byte range on character boundaries.
///
/// An empty selection is a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    selection: Range<usize>,
}

impl InputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The current selection.
    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// The selected text.
    pub fn selected(&self) -> &str {
        &self.text[self.selection.clone()]
    }

    /// True when the text is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Replace the text and put the cursor at the end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.selection = self.text.len()..self.text.len();
    }

    /// Select `range`, clamped to the text and widened to character
    /// boundaries.
    pub fn select(&mut self, range: Range<usize>) {
        let mut start = range.start.min(self.text.len());
        let mut end = range.end.clamp(start, self.text.len());
        while !self.text.is_char_boundary(start) {
            start -= 1;
        }
        while !self.text.is_char_boundary(end) {
            end += 1;
        }
        self.selection = start..end;
    }

    /// Select the whole text.
    pub fn select_all(&mut self) {
        self.selection = 0..self.text.len();
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.text.clear();
        self.selection = 0..0;
    }

    /// Empty the buffer, returning its text.
    pub fn take(&mut self) -> String {
        self.selection = 0..0;
        std::mem::take(&mut self.text)
    }

    /// Append `text` to the end, separated by a space from existing text,
    /// and select it.
    pub fn push_selected(&mut self, text: &str) {
        if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push(' ');
        }
        let start = self.text.len();
        self.text.push_str(text);
        self.selection = start..self.text.len();
    }

    /// Wrap the selection in `prefix` and `suffix`.  The selection moves
    /// with the wrapped text so presets can be stacked.
    pub fn insert_markdown(&mut self, prefix: &str, suffix: &str) {
        let Range { start, end } = self.selection.clone();
        let mut text = String::with_capacity(self.text.len() + prefix.len() + suffix.len());
        text.push_str(&self.text[..start]);
        text.push_str(prefix);
        text.push_str(&self.text[start..end]);
        text.push_str(suffix);
        text.push_str(&self.text[end..]);
        self.text = text;
        self.selection = start + prefix.len()..end + prefix.len();
    }

    /// Apply a [`MarkdownPreset`].
    pub fn apply(&mut self, preset: MarkdownPreset) {
        self.insert_markdown(preset.prefix(), preset.suffix());
    }
}
