//! Markdown rendering for the terminal.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const YELLOW: &str = "\x1b[33m";
const GOLD: &str = "\x1b[38;5;178m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Label shown for a code block without a language.
pub const DEFAULT_CODE_LABEL: &str = "code";

fn parser(markdown: &str) -> Parser<'_> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    Parser::new_ext(markdown, options)
}

/// Language from a code fence's info string.
pub fn extract_code_language(info: &str) -> Option<String> {
    info.split_whitespace().next().map(|s| s.to_string())
}

/// A fenced or indented code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language from the fence, if any.
    pub language: Option<String>,
    /// The code, without the fence and without its trailing newline.
    pub code: String,
}

impl CodeBlock {
    /// The language label, falling back to [`DEFAULT_CODE_LABEL`].
    pub fn label(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_CODE_LABEL)
    }
}

/// Every code block in `markdown`, in document order.
pub fn extract_code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;
    for event in parser(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => extract_code_language(&info),
                    CodeBlockKind::Indented => None,
                };
                current = Some(CodeBlock {
                    language,
                    code: String::new(),
                });
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(mut block) = current.take() {
                    if block.code.ends_with('\n') {
                        block.code.pop();
                    }
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }
    blocks
}

/// Renders markdown as terminal text, with ANSI styling when enabled.
struct TerminalWriter {
    out: String,
    use_color: bool,
    styles: Vec<&'static str>,
    lists: Vec<Option<u64>>,
    in_code_block: bool,
    link_dest: Vec<String>,
}

impl TerminalWriter {
    fn new(use_color: bool) -> Self {
        Self {
            out: String::new(),
            use_color,
            styles: Vec::new(),
            lists: Vec::new(),
            in_code_block: false,
            link_dest: Vec::new(),
        }
    }

    fn push_style(&mut self, style: &'static str) {
        if self.use_color {
            self.out.push_str(style);
        }
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
        if self.use_color {
            self.out.push_str(RESET);
            for style in &self.styles {
                self.out.push_str(style);
            }
        }
    }

    fn styled(&mut self, style: &'static str, text: &str) {
        if self.use_color {
            self.out.push_str(style);
            self.out.push_str(text);
            self.out.push_str(RESET);
            for style in &self.styles {
                self.out.push_str(style);
            }
        } else {
            self.out.push_str(text);
        }
    }

    fn block_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        if self.lists.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => {
                for line in text.split_inclusive('\n') {
                    self.styled(GOLD, "│ ");
                    self.out.push_str(line);
                }
            }
            Event::Text(text) => self.out.push_str(&text),
            Event::Code(code) => {
                if self.use_color {
                    self.styled(YELLOW, &code);
                } else {
                    self.out.push('`');
                    self.out.push_str(&code);
                    self.out.push('`');
                }
            }
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.block_break();
                self.styled(DIM, "────────");
                self.out.push_str("\n\n");
            }
            Event::TaskListMarker(done) => {
                self.out.push_str(if done { "[x] " } else { "[ ] " });
            }
            Event::Html(html) | Event::InlineHtml(html) => self.out.push_str(&html),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { .. } => {
                self.block_break();
                self.push_style(BOLD);
                self.push_style(GOLD);
            }
            Tag::CodeBlock(kind) => {
                self.block_break();
                let label = match kind {
                    CodeBlockKind::Fenced(info) => extract_code_language(&info),
                    CodeBlockKind::Indented => None,
                };
                let label = label.unwrap_or_else(|| DEFAULT_CODE_LABEL.to_string());
                self.styled(GOLD, &format!("┌─ {label}\n"));
                self.in_code_block = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_break();
                } else if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.lists.push(start);
            }
            Tag::Item => {
                let depth = self.lists.len().saturating_sub(1);
                self.out.push_str(&"  ".repeat(depth));
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{n}. ");
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.styled(GOLD, &bullet);
            }
            Tag::Emphasis => self.push_style(ITALIC),
            Tag::Strong => self.push_style(BOLD),
            Tag::Link { dest_url, .. } => {
                self.link_dest.push(dest_url.to_string());
                self.push_style(UNDERLINE);
            }
            Tag::BlockQuote(_) => {
                self.block_break();
                self.styled(DIM, "> ");
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.block_break(),
            TagEnd::Heading(_) => {
                self.pop_style();
                self.pop_style();
                self.block_break();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.styled(GOLD, "└─");
                self.out.push('\n');
                self.block_break();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.block_break();
            }
            TagEnd::Item => {
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
            }
            TagEnd::Emphasis | TagEnd::Strong => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                match self.link_dest.pop() {
                    Some(dest) if !dest.is_empty() => {
                        self.styled(DIM, &format!(" ({dest})"));
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

/// Render `markdown` for display in a terminal.
///
/// Code blocks are framed and labeled with their language.  Without color
/// the output carries no escape sequences.
pub fn render_markdown(markdown: &str, use_color: bool) -> String {
    let mut writer = TerminalWriter::new(use_color);
    for event in parser(markdown) {
        writer.event(event);
    }
    let trimmed = writer.out.trim_end_matches('\n').len();
    writer.out.truncate(trimmed);
    writer.out
}
