//! Interactive terminal chat with G9 AI.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; reads GEMINI_API_KEY (or API_KEY)
//! g9-chat
//!
//! # Pick a model and keep sessions somewhere else
//! g9-chat --model gemini-2.5-pro --data-dir ~/notes/g9
//!
//! # Disable colors (useful for piping output)
//! g9-chat --no-color
//! ```
//!
//! Type `/help` for commands.  Ctrl+C stops a streaming reply; Ctrl+D exits.
//! Set `RUST_LOG=g9chat=debug` for diagnostics on stderr.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use g9chat::chat::{
    Chat, ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, TurnOutcome, help_text,
    parse_command,
};
use g9chat::render::{format_clock, format_transcript, local_offset};
use g9chat::{
    FileStore, FragmentSource, Gemini, GeminiSource, KeyValueStore, MemoryStore,
    Osc52Clipboard, SessionStore,
};

type Backend = Box<dyn KeyValueStore>;

/// Main entry point for the g9-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("g9-chat [OPTIONS]");
    let config = match ChatConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("g9-chat: {err}");
            std::process::exit(2);
        }
    };
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let client = Gemini::with_options(config.api_key.clone(), config.base_url.clone(), None)?;
    let source = GeminiSource::new(client, config.generation_params());

    let backend: Backend = match config.resolved_data_dir() {
        Some(dir) => Box::new(FileStore::open(dir)?),
        None => {
            tracing::warn!("no data directory; sessions will not outlive this process");
            Box::new(MemoryStore::new())
        }
    };
    let mut store = SessionStore::new(backend);
    if let Err(err) = store.load() {
        tracing::error!(error = %err, "could not load saved sessions");
        renderer.print_error("Saved sessions could not be read; starting with an empty history.");
    }

    let mut chat = Chat::new(source, store);
    let stop = chat.stop_handle();
    ctrlc::set_handler(move || {
        stop.stop();
    })?;

    let mut clipboard = Osc52Clipboard::new();
    let mut rl = DefaultEditor::new()?;

    println!("G9 AI (model: {})", config.model);
    println!("Type /help for commands, /quit to exit\n");
    print_transcript(&chat, config.use_color);

    loop {
        let draft = chat.conversation().input().text().to_string();
        let readline = if draft.is_empty() {
            rl.readline("You: ")
        } else {
            rl.readline_with_initial("You: ", (&draft, ""))
        };

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    chat.conversation_mut().input_mut().clear();
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if let Some(cmd) = parse_command(&line) {
                    if !handle_command(cmd, &mut chat, &config, &mut renderer, &mut clipboard).await
                    {
                        break;
                    }
                    continue;
                }

                chat.conversation_mut().input_mut().set_text(line);
                println!("G9:");
                let result = chat.send_input(&mut renderer).await;
                report_turn(result, &mut renderer, "Nothing to send.");
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt discards the draft.
                chat.conversation_mut().input_mut().clear();
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Run a slash command.  Returns false when the REPL should exit.
async fn handle_command<F: FragmentSource>(
    cmd: ChatCommand,
    chat: &mut Chat<F, Backend>,
    config: &ChatConfig,
    renderer: &mut PlainTextRenderer,
    clipboard: &mut Osc52Clipboard,
) -> bool {
    match cmd {
        ChatCommand::Quit => {
            println!("Goodbye!");
            return false;
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::New => {
            chat.new_session();
            renderer.print_info("Started a new conversation.");
            print_transcript(chat, config.use_color);
        }
        ChatCommand::History => print_history(chat),
        ChatCommand::Load(n) => {
            let Some(id) = chat.session_at(n - 1).map(|s| s.id.clone()) else {
                renderer.print_error(&format!("No saved session {n}."));
                return true;
            };
            if chat.load_session(&id) {
                print_transcript(chat, config.use_color);
            } else {
                renderer.print_error(&format!("Could not load session {n}."));
            }
        }
        ChatCommand::Rename(n, title) => {
            let Some(id) = chat.session_at(n - 1).map(|s| s.id.clone()) else {
                renderer.print_error(&format!("No saved session {n}."));
                return true;
            };
            match chat.rename_session(&id, &title) {
                Ok(true) => renderer.print_info(&format!("Session {n} renamed to {title}.")),
                Ok(false) => renderer.print_error("Title must not be blank."),
                Err(err) => renderer.print_error(&format!("Failed to rename session: {err}")),
            }
        }
        ChatCommand::Delete(n) => {
            let Some(id) = chat.session_at(n - 1).map(|s| s.id.clone()) else {
                renderer.print_error(&format!("No saved session {n}."));
                return true;
            };
            let was_active = chat.current_session() == Some(&id);
            match chat.delete_session(&id) {
                Ok(_) => {
                    renderer.print_info(&format!("Session {n} deleted."));
                    if was_active {
                        print_transcript(chat, config.use_color);
                    }
                }
                Err(err) => renderer.print_error(&format!("Failed to delete session: {err}")),
            }
        }
        ChatCommand::Regenerate(n) => {
            println!("G9:");
            let result = match n {
                Some(n) => chat.regenerate(n - 1, renderer).await,
                None => chat.regenerate_last(renderer).await,
            };
            report_turn(result, renderer, "Nothing to regenerate.");
        }
        ChatCommand::Refine(refinement) => {
            println!("G9:");
            let result = chat.refine(refinement, renderer).await;
            report_turn(result, renderer, "Nothing to refine.");
        }
        ChatCommand::Edit(n) => {
            let messages = chat.conversation().messages();
            let target = match n {
                Some(n) => messages.get(n - 1),
                None => messages.iter().rev().find(|m| m.is_user()),
            };
            match target {
                Some(message) if message.is_user() => {
                    let content = message.content.clone();
                    chat.conversation_mut().edit_user_prompt(&content);
                }
                Some(_) => renderer.print_error("Only your own prompts can be edited."),
                None => renderer.print_error("No prompt to edit."),
            }
        }
        ChatCommand::Copy(n) => {
            let copied = match n {
                Some(n) => chat.copy_message(n - 1, clipboard),
                None => chat.copy_last_reply(clipboard),
            };
            if copied {
                renderer.print_info("Copied.");
            } else {
                renderer.print_error("No such message.");
            }
        }
        ChatCommand::CopyCode(k) => match chat.copy_code_block(k.unwrap_or(1) - 1, clipboard) {
            Some(label) => renderer.print_info(&format!("Copied {label} block.")),
            None => renderer.print_error("No such code block in the last reply."),
        },
        ChatCommand::Markdown(preset, text) => {
            let input = chat.conversation_mut().input_mut();
            match text {
                Some(text) => input.push_selected(&text),
                None => input.select_all(),
            }
            input.apply(preset);
        }
        ChatCommand::Show => print_transcript(chat, config.use_color),
        ChatCommand::ShowConfig => {
            println!("    Current Configuration:");
            for line in config.describe().lines() {
                println!("      {}", line);
            }
        }
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    true
}

fn report_turn(
    result: g9chat::Result<TurnOutcome>,
    renderer: &mut PlainTextRenderer,
    ignored: &str,
) {
    match result {
        Ok(TurnOutcome::Ignored) => renderer.print_error(ignored),
        Ok(TurnOutcome::Failed(err)) if err.is_retryable() => {
            renderer.print_info("Use /regenerate to try again.");
        }
        Ok(_) => {}
        Err(err) => renderer.print_error(&format!("Failed to save session: {err}")),
    }
}

fn print_transcript<F: FragmentSource>(chat: &Chat<F, Backend>, use_color: bool) {
    let transcript = format_transcript(chat.conversation().messages(), local_offset(), use_color);
    println!("{transcript}");
}

fn print_history<F: FragmentSource>(chat: &Chat<F, Backend>) {
    let sessions = chat.store().list();
    if sessions.is_empty() {
        println!("    No saved sessions.");
        return;
    }
    let offset = local_offset();
    println!("    Saved sessions:");
    for (i, session) in sessions.iter().enumerate() {
        let marker = if chat.current_session() == Some(&session.id) {
            "*"
        } else {
            " "
        };
        println!(
            "    {marker} {}. {} ({} prompts, {} {})",
            i + 1,
            session.title,
            session.prompt_count(),
            session.updated_at.to_offset(offset).date(),
            format_clock(session.updated_at, offset),
        );
    }
}
