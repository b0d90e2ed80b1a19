//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the session and is never sent to the
//! model.  Numeric arguments are the 1-based numbers shown by `/show` and
//! `/history`.

use crate::conversation::Refinement;
use crate::input::MarkdownPreset;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation.
    New,

    /// List saved sessions.
    History,

    /// Resume a saved session.
    Load(usize),

    /// Retitle a saved session.
    Rename(usize, String),

    /// Delete a saved session.
    Delete(usize),

    /// Regenerate a reply; defaults to the last one.
    Regenerate(Option<usize>),

    /// Ask for a shorter or longer version of the last reply.
    Refine(Refinement),

    /// Load a prompt into the input for editing; defaults to the last one.
    Edit(Option<usize>),

    /// Copy a message; defaults to the last reply.
    Copy(Option<usize>),

    /// Copy a code block from the last reply; defaults to the first.
    CopyCode(Option<usize>),

    /// Wrap text in the draft with markdown, optionally appending text first.
    Markdown(MarkdownPreset, Option<String>),

    /// Print the conversation.
    Show,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a prompt.
///
/// # Examples
///
/// ```
/// # use g9chat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command("/load 2"), Some(ChatCommand::Load(2)));
/// assert!(parse_command("Explain lifetimes").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" | "clear" => ChatCommand::New,
        "history" | "sessions" => ChatCommand::History,
        "load" => required_index(argument, "/load", ChatCommand::Load),
        "delete" | "rm" => required_index(argument, "/delete", ChatCommand::Delete),
        "rename" => parse_rename(argument),
        "regenerate" | "regen" => optional_index(argument, "/regenerate", ChatCommand::Regenerate),
        "shorter" => ChatCommand::Refine(Refinement::Shorter),
        "longer" => ChatCommand::Refine(Refinement::Longer),
        "edit" => optional_index(argument, "/edit", ChatCommand::Edit),
        "copy" => optional_index(argument, "/copy", ChatCommand::Copy),
        "copycode" => optional_index(argument, "/copycode", ChatCommand::CopyCode),
        "bold" => markdown(MarkdownPreset::Bold, argument),
        "italic" => markdown(MarkdownPreset::Italic, argument),
        "code" => markdown(MarkdownPreset::Code, argument),
        "codeblock" => markdown(MarkdownPreset::CodeBlock, argument),
        "link" => markdown(MarkdownPreset::Link, argument),
        "list" => markdown(MarkdownPreset::List, argument),
        "show" => ChatCommand::Show,
        "config" => ChatCommand::ShowConfig,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn markdown(preset: MarkdownPreset, argument: Option<&str>) -> ChatCommand {
    ChatCommand::Markdown(preset, argument.map(|s| s.to_string()))
}

fn parse_index(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|n| *n > 0)
}

fn required_index<F>(argument: Option<&str>, name: &str, constructor: F) -> ChatCommand
where
    F: Fn(usize) -> ChatCommand,
{
    match argument {
        Some(arg) => match parse_index(arg) {
            Some(value) => constructor(value),
            None => ChatCommand::Invalid(format!("{} expects a positive number", name)),
        },
        None => ChatCommand::Invalid(format!("{} requires a number", name)),
    }
}

fn optional_index<F>(argument: Option<&str>, name: &str, constructor: F) -> ChatCommand
where
    F: Fn(Option<usize>) -> ChatCommand,
{
    match argument {
        Some(arg) => match parse_index(arg) {
            Some(value) => constructor(Some(value)),
            None => ChatCommand::Invalid(format!("{} expects a positive number", name)),
        },
        None => constructor(None),
    }
}

fn parse_rename(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/rename requires a number and a title".to_string());
    };
    let mut parts = arg.splitn(2, char::is_whitespace);
    let index = parts.next().and_then(parse_index);
    let title = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());
    match (index, title) {
        (Some(index), Some(title)) => ChatCommand::Rename(index, title.to_string()),
        (None, _) => ChatCommand::Invalid("/rename expects a positive number".to_string()),
        (Some(_), None) => ChatCommand::Invalid("/rename requires a title".to_string()),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new conversation
  /history               List saved sessions
  /load <n>              Resume saved session n
  /rename <n> <title>    Rename saved session n
  /delete <n>            Delete saved session n
  /regenerate [n]        Regenerate reply n (default: the last reply)
  /shorter               Ask for a shorter version of the last reply
  /longer                Ask for a more detailed version of the last reply
  /edit [n]              Edit prompt n (default: the last prompt)
  /copy [n]              Copy message n (default: the last reply)
  /copycode [k]          Copy code block k of the last reply (default: 1)
  /bold [text]           Wrap the draft (or text) in **bold**
  /italic [text]         Wrap the draft (or text) in _italics_
  /code [text]           Wrap the draft (or text) in `code`
  /codeblock [text]      Wrap the draft (or text) in a fenced code block
  /link [text]           Turn the draft (or text) into a [link](url)
  /list [text]           Start a bullet list item
  /show                  Print the conversation
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl+C while a reply is streaming to stop it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/HISTORY"), Some(ChatCommand::History));
        assert_eq!(parse_command("/load 3"), Some(ChatCommand::Load(3)));
        assert_eq!(parse_command("/delete 1"), Some(ChatCommand::Delete(1)));
        assert!(matches!(
            parse_command("/load"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert!(matches!(
            parse_command("/load 0"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("positive")
        ));
    }

    #[test]
    fn parse_rename() {
        assert_eq!(
            parse_command("/rename 2 Borrow checker notes"),
            Some(ChatCommand::Rename(2, "Borrow checker notes".to_string()))
        );
        assert!(matches!(
            parse_command("/rename 2"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("title")
        ));
        assert!(matches!(
            parse_command("/rename notes"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_turn_commands() {
        assert_eq!(
            parse_command("/regenerate"),
            Some(ChatCommand::Regenerate(None))
        );
        assert_eq!(
            parse_command("/regenerate 4"),
            Some(ChatCommand::Regenerate(Some(4)))
        );
        assert_eq!(
            parse_command("/shorter"),
            Some(ChatCommand::Refine(Refinement::Shorter))
        );
        assert_eq!(
            parse_command("/longer"),
            Some(ChatCommand::Refine(Refinement::Longer))
        );
        assert_eq!(parse_command("/edit"), Some(ChatCommand::Edit(None)));
        assert_eq!(parse_command("/copy 2"), Some(ChatCommand::Copy(Some(2))));
        assert_eq!(
            parse_command("/copycode"),
            Some(ChatCommand::CopyCode(None))
        );
    }

    #[test]
    fn parse_markdown_presets() {
        assert_eq!(
            parse_command("/bold"),
            Some(ChatCommand::Markdown(MarkdownPreset::Bold, None))
        );
        assert_eq!(
            parse_command("/code  Vec<u8> "),
            Some(ChatCommand::Markdown(
                MarkdownPreset::Code,
                Some("Vec<u8>".to_string())
            ))
        );
        assert_eq!(
            parse_command("/codeblock"),
            Some(ChatCommand::Markdown(MarkdownPreset::CodeBlock, None))
        );
    }

    #[test]
    fn unknown_command_is_invalid() {
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, G9!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/regenerate"));
        assert!(help.contains("/copycode"));
    }
}
