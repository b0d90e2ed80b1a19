//! The chat driver.
//!
//! [`Chat`] ties a [`Conversation`] to a [`FragmentSource`] and a
//! [`SessionStore`]: it runs turns, renders fragments as they are merged and
//! flushes the conversation to the store when a turn completes or is
//! stopped.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::clipboard::Clipboard;
use crate::conversation::{Conversation, Refinement, Turn};
use crate::markdown::extract_code_blocks;
use crate::observability::STREAM_DURATION;
use crate::render::Renderer;
use crate::store::{KeyValueStore, SessionStore};
use crate::stream::FragmentSource;
use crate::types::{ChatSession, SessionId};
use crate::{Error, Result};

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The request was not started: blank prompt, nothing to regenerate, or
    /// a generation already in flight.
    Ignored,
    /// The stream was exhausted.
    Completed,
    /// The user stopped the stream; the partial reply was kept.
    Cancelled,
    /// The stream failed; the reply was marked.
    Failed(Error),
}

impl TurnOutcome {
    /// True for [`TurnOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed)
    }
}

/// A shareable handle that stops the in-flight turn, e.g. from a signal
/// handler.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl StopHandle {
    /// Create a disarmed handle.
    pub fn new() -> Self {
        Self::default()
    }

    fn arm(&self, token: CancellationToken) {
        if let Ok(mut active) = self.active.lock() {
            *active = Some(token);
        }
    }

    fn disarm(&self) {
        if let Ok(mut active) = self.active.lock() {
            *active = None;
        }
    }

    /// Cancel the in-flight turn.  Returns false if nothing was streaming.
    pub fn stop(&self) -> bool {
        let token = match self.active.lock() {
            Ok(mut active) => active.take(),
            Err(_) => None,
        };
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// A conversation bound to a model and a session store.
pub struct Chat<F, S> {
    conversation: Conversation,
    current: Option<SessionId>,
    store: SessionStore<S>,
    source: F,
    stop: StopHandle,
}

impl<F: FragmentSource, S: KeyValueStore> Chat<F, S> {
    /// Start a fresh conversation.
    pub fn new(source: F, store: SessionStore<S>) -> Self {
        Self {
            conversation: Conversation::new(),
            current: None,
            store,
            source,
            stop: StopHandle::new(),
        }
    }

    /// The conversation.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The conversation, for editing the prompt buffer.
    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// The session the conversation is saved to, if it has been saved.
    pub fn current_session(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    /// The saved sessions.
    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    /// The fragment source.
    pub fn source(&self) -> &F {
        &self.source
    }

    /// A handle that stops the in-flight turn.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Send `prompt` and stream the reply.
    pub async fn send(&mut self, prompt: &str, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        let turn = self.conversation.send(prompt);
        self.drive(turn, renderer).await
    }

    /// Send the prompt buffer and stream the reply.
    pub async fn send_input(&mut self, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        let turn = self.conversation.send_input();
        self.drive(turn, renderer).await
    }

    /// Regenerate the reply at `index` (0-based).
    pub async fn regenerate(
        &mut self,
        index: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let turn = self.conversation.regenerate(index);
        self.drive(turn, renderer).await
    }

    /// Regenerate the last reply.
    pub async fn regenerate_last(&mut self, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        let index = self
            .conversation
            .messages()
            .iter()
            .rposition(|m| m.is_assistant());
        match index {
            Some(index) => self.regenerate(index, renderer).await,
            None => Ok(TurnOutcome::Ignored),
        }
    }

    /// Ask for a shorter or longer version of the last reply.
    pub async fn refine(
        &mut self,
        refinement: Refinement,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let turn = self.conversation.refine(refinement);
        self.drive(turn, renderer).await
    }

    async fn drive(
        &mut self,
        turn: Option<Turn>,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let Some(turn) = turn else {
            return Ok(TurnOutcome::Ignored);
        };
        self.stop.arm(turn.cancel.clone());
        let outcome = self.run_turn(turn, renderer).await;
        self.stop.disarm();
        match outcome {
            TurnOutcome::Completed | TurnOutcome::Cancelled => self.flush()?,
            _ => {}
        }
        Ok(outcome)
    }

    async fn run_turn(&mut self, turn: Turn, renderer: &mut dyn Renderer) -> TurnOutcome {
        let start = Instant::now();
        tracing::debug!(history = turn.history.len(), "starting turn");
        let mut fragments = self.source.generate(&turn.history, turn.cancel.clone());
        let mut failure = None;
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    if self.conversation.apply_fragment(&turn.placeholder, &fragment) {
                        renderer.print_text(&fragment);
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        STREAM_DURATION.add(start.elapsed().as_secs_f64());

        if turn.cancel.is_cancelled() {
            self.conversation.stop();
            renderer.print_interrupted();
            tracing::info!(
                chars = self.conversation.accumulated().len(),
                "turn stopped"
            );
            return TurnOutcome::Cancelled;
        }
        if let Some(err) = failure {
            self.conversation.fail(&turn.placeholder);
            renderer.print_error(&err.to_string());
            tracing::error!(error = %err, "turn failed");
            return TurnOutcome::Failed(err);
        }
        self.conversation.finish(&turn.placeholder);
        renderer.finish_response();
        tracing::debug!(
            chars = self.conversation.accumulated().len(),
            "turn completed"
        );
        TurnOutcome::Completed
    }

    /// Save the conversation to the current session, creating one if needed.
    pub fn flush(&mut self) -> Result<()> {
        let saved = self
            .store
            .save_conversation(self.current.as_ref(), self.conversation.messages())?;
        if let Some(id) = saved {
            self.current = Some(id);
        }
        Ok(())
    }

    /// Start a new conversation.  The previous one stays saved.
    pub fn new_session(&mut self) {
        self.conversation.stop();
        self.conversation = Conversation::new();
        self.current = None;
    }

    /// Resume a saved session.  Returns false if it does not exist or a
    /// generation is in flight.
    pub fn load_session(&mut self, id: &SessionId) -> bool {
        if !self.conversation.is_idle() {
            return false;
        }
        let Some(session) = self.store.get(id) else {
            return false;
        };
        self.conversation = Conversation::from_messages(session.messages.clone());
        self.current = Some(session.id.clone());
        true
    }

    /// Delete a saved session.  Deleting the active session starts a new
    /// conversation.
    pub fn delete_session(&mut self, id: &SessionId) -> Result<bool> {
        let removed = self.store.remove(id)?;
        if self.current.as_ref() == Some(id) {
            self.new_session();
        }
        Ok(removed)
    }

    /// Retitle a saved session.  Blank titles are ignored.
    pub fn rename_session(&mut self, id: &SessionId, title: &str) -> Result<bool> {
        self.store.rename(id, title)
    }

    /// The saved session at 0-based position `index` in the history list.
    pub fn session_at(&self, index: usize) -> Option<&ChatSession> {
        self.store.list().get(index)
    }

    /// Copy the message at `index` (0-based) to `clipboard`.  Returns false
    /// if there is no such message.
    pub fn copy_message(&self, index: usize, clipboard: &mut dyn Clipboard) -> bool {
        match self.conversation.messages().get(index) {
            Some(message) => {
                clipboard.write_text(&message.content);
                true
            }
            None => false,
        }
    }

    /// Copy the last reply to `clipboard`.
    pub fn copy_last_reply(&self, clipboard: &mut dyn Clipboard) -> bool {
        match self.conversation.last_assistant() {
            Some(message) => {
                clipboard.write_text(&message.content);
                true
            }
            None => false,
        }
    }

    /// Copy code block `index` (0-based) of the last reply to `clipboard`.
    /// Returns the block's language label, or `None` if there is no such
    /// block.
    pub fn copy_code_block(&self, index: usize, clipboard: &mut dyn Clipboard) -> Option<String> {
        let reply = self.conversation.last_assistant()?;
        let block = extract_code_blocks(&reply.content).into_iter().nth(index)?;
        clipboard.write_text(&block.code);
        Some(block.label().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream;

    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::conversation::{ERROR_MARKER, GREETING};
    use crate::store::MemoryStore;
    use crate::stream::{FragmentStream, cancellable};
    use crate::types::Message;

    /// Replays scripted fragments, optionally failing at the end.
    struct Scripted {
        fragments: Vec<&'static str>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(fragments: Vec<&'static str>) -> Self {
            Self {
                fail: true,
                ..Self::new(fragments)
            }
        }
    }

    impl FragmentSource for Scripted {
        fn generate(&self, _: &[Message], cancel: CancellationToken) -> FragmentStream {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let mut items: Vec<Result<String>> =
                self.fragments.iter().map(|f| Ok(f.to_string())).collect();
            if self.fail {
                items.push(Err(Error::internal_server("boom")));
            }
            cancellable(stream::iter(items), cancel)
        }
    }

    #[derive(Default)]
    struct Recorder {
        text: String,
        errors: Vec<String>,
        interrupted: bool,
        finished: bool,
    }

    impl Renderer for Recorder {
        fn print_text(&mut self, text: &str) {
            self.text.push_str(text);
        }

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn print_info(&mut self, _: &str) {}

        fn finish_response(&mut self) {
            self.finished = true;
        }

        fn print_interrupted(&mut self) {
            self.interrupted = true;
        }
    }

    /// Fails the next `failures` writes, then stores in memory.
    struct FailingWrites {
        inner: MemoryStore,
        failures: AtomicUsize,
    }

    impl KeyValueStore for FailingWrites {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::storage("disk full", key));
            }
            self.inner.set(key, value)
        }
    }

    fn chat(source: Scripted) -> Chat<Scripted, MemoryStore> {
        Chat::new(source, SessionStore::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn send_streams_and_saves() {
        let mut chat = chat(Scripted::new(vec!["Hi", " there"]));
        let mut renderer = Recorder::default();
        let outcome = chat.send("Hello", &mut renderer).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(renderer.text, "Hi there");
        assert!(renderer.finished);
        assert_eq!(chat.conversation().messages()[2].content, "Hi there");

        let id = chat.current_session().unwrap().clone();
        let session = chat.store().get(&id).unwrap();
        assert_eq!(session.title, "Hello");
        assert_eq!(chat.store().len(), 1);
    }

    #[tokio::test]
    async fn second_turn_updates_same_session() {
        let mut chat = chat(Scripted::new(vec!["ok"]));
        let mut renderer = Recorder::default();
        chat.send("first", &mut renderer).await.unwrap();
        chat.send("second", &mut renderer).await.unwrap();
        assert_eq!(chat.store().len(), 1);
        assert_eq!(chat.store().list()[0].messages.len(), 5);
        assert_eq!(chat.store().list()[0].title, "first");
    }

    #[tokio::test]
    async fn failure_marks_reply_and_skips_flush() {
        let mut chat = chat(Scripted::failing(vec!["partial"]));
        let mut renderer = Recorder::default();
        let outcome = chat.send("Hello", &mut renderer).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed(_)));
        assert_eq!(renderer.errors.len(), 1);
        assert_eq!(
            chat.conversation().messages()[2].content,
            format!("partial{ERROR_MARKER}")
        );
        assert!(chat.conversation().is_idle());
        assert!(chat.store().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_one_session() {
        let backend = FailingWrites {
            inner: MemoryStore::new(),
            failures: AtomicUsize::new(1),
        };
        let mut chat = Chat::new(Scripted::new(vec!["ok"]), SessionStore::new(backend));
        let mut renderer = Recorder::default();

        let err = chat.send("Hello", &mut renderer).await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
        assert!(chat.current_session().is_none());
        assert!(chat.store().is_empty());
        assert_eq!(chat.conversation().messages().len(), 3);

        chat.send("Again", &mut renderer).await.unwrap();
        let id = chat.current_session().unwrap().clone();
        assert_eq!(chat.store().len(), 1);
        assert_eq!(chat.store().get(&id).unwrap().title, "Hello");
        assert_eq!(chat.store().get(&id).unwrap().messages.len(), 5);

        let reloaded = SessionStore::open(chat.store().backend()).unwrap();
        assert_eq!(reloaded.list(), chat.store().list());
    }

    #[tokio::test]
    async fn blank_prompt_is_ignored() {
        let mut chat = chat(Scripted::new(vec!["x"]));
        let mut renderer = Recorder::default();
        let outcome = chat.send("  ", &mut renderer).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Ignored));
        assert_eq!(chat.source().calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn regenerate_last_replaces_reply() {
        let mut chat = chat(Scripted::new(vec!["again"]));
        let mut renderer = Recorder::default();
        chat.send("Hello", &mut renderer).await.unwrap();
        chat.regenerate_last(&mut renderer).await.unwrap();
        let messages = chat.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(messages[2].content, "again");
        assert_eq!(chat.store().len(), 1);
    }

    #[tokio::test]
    async fn delete_active_session_starts_new_chat() {
        let mut chat = chat(Scripted::new(vec!["Hi"]));
        let mut renderer = Recorder::default();
        chat.send("Hello", &mut renderer).await.unwrap();
        let id = chat.current_session().unwrap().clone();
        assert!(chat.delete_session(&id).unwrap());
        assert!(chat.current_session().is_none());
        assert_eq!(chat.conversation().messages().len(), 1);
        assert_eq!(chat.conversation().messages()[0].content, GREETING);
    }

    #[tokio::test]
    async fn load_session_resumes_messages() {
        let mut chat = chat(Scripted::new(vec!["Hi"]));
        let mut renderer = Recorder::default();
        chat.send("Hello", &mut renderer).await.unwrap();
        let id = chat.current_session().unwrap().clone();
        chat.new_session();
        assert_eq!(chat.conversation().messages().len(), 1);
        assert!(chat.load_session(&id));
        assert_eq!(chat.conversation().messages().len(), 3);
        assert_eq!(chat.current_session(), Some(&id));
        assert!(!chat.load_session(&SessionId::from("missing")));
    }

    #[tokio::test]
    async fn copy_commands_write_clipboard() {
        let mut chat = chat(Scripted::new(vec![
            "Try:\n\n```rust\nlet x = 1;\n```\n\nand\n\n```\nls\n```",
        ]));
        let mut renderer = Recorder::default();
        chat.send("Hello", &mut renderer).await.unwrap();
        let mut clipboard = MemoryClipboard::new();

        assert!(chat.copy_message(1, &mut clipboard));
        assert_eq!(clipboard.contents(), Some("Hello"));
        assert!(chat.copy_last_reply(&mut clipboard));
        assert!(clipboard.contents().unwrap().starts_with("Try:"));

        assert_eq!(
            chat.copy_code_block(0, &mut clipboard).as_deref(),
            Some("rust")
        );
        assert_eq!(clipboard.contents(), Some("let x = 1;"));
        assert_eq!(
            chat.copy_code_block(1, &mut clipboard).as_deref(),
            Some("code")
        );
        assert!(chat.copy_code_block(2, &mut clipboard).is_none());
        assert!(!chat.copy_message(9, &mut clipboard));
    }

    #[test]
    fn stop_handle_without_turn_is_noop() {
        let handle = StopHandle::new();
        assert!(!handle.stop());
        let token = CancellationToken::new();
        handle.arm(token.clone());
        assert!(handle.stop());
        assert!(token.is_cancelled());
        assert!(!handle.stop());
    }
}
