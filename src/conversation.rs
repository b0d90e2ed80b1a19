//! The conversation reducer.
//!
//! A [`Conversation`] owns the message list, the prompt buffer and the state
//! of the single in-flight generation.  It performs no I/O: starting a turn
//! returns a [`Turn`] describing the request, and the caller feeds the
//! resulting fragments back in with [`Conversation::apply_fragment`] before
//! closing the turn with [`Conversation::finish`], [`Conversation::stop`] or
//! [`Conversation::fail`].
//!
//! ```text
//! Idle --send--> Sending --fragment--> Streaming --end/stop/error--> Idle
//! ```

use tokio_util::sync::CancellationToken;

use crate::input::InputBuffer;
use crate::types::{Message, MessageId};

/// The assistant's opening line in a fresh conversation.
pub const GREETING: &str = "Greetings. I am G9 AI. How may I assist your development today?";

/// Appended to a partial reply when generation fails.
pub const ERROR_MARKER: &str = "\n\n_System Error._";

/// Canned follow-up instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    /// Ask for a shorter version of the previous reply.
    Shorter,
    /// Ask for a more detailed version of the previous reply.
    Longer,
}

impl Refinement {
    /// The prompt sent for this refinement.
    pub fn instruction(self) -> &'static str {
        match self {
            Refinement::Shorter => {
                "Make the previous response significantly shorter and more concise."
            }
            Refinement::Longer => {
                "Provide a much more detailed and comprehensive explanation for the previous response."
            }
        }
    }
}

/// Where the reducer is in the generation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No generation in flight.
    #[default]
    Idle,
    /// A request was issued and no fragment has arrived yet.
    Sending,
    /// At least one fragment has been merged.
    Streaming,
}

/// A generation the caller must run.
#[derive(Debug, Clone)]
pub struct Turn {
    /// The assistant message fragments are merged into.
    pub placeholder: MessageId,
    /// The history to send, ending with the prompting user message.
    pub history: Vec<Message>,
    /// Fires when the turn is stopped.
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone)]
struct ActiveTurn {
    placeholder: MessageId,
    cancel: CancellationToken,
}

/// A conversation and its single in-flight generation.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    phase: Phase,
    input: InputBuffer,
    accumulator: String,
    active: Option<ActiveTurn>,
}

impl Conversation {
    /// A fresh conversation holding only the greeting.
    pub fn new() -> Self {
        Self::from_messages(vec![Message::assistant(GREETING)])
    }

    /// A conversation resumed from saved messages.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            phase: Phase::Idle,
            input: InputBuffer::new(),
            accumulator: String::new(),
            active: None,
        }
    }

    /// The messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True when no generation is in flight.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// The prompt buffer.
    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// The prompt buffer, for editing.
    pub fn input_mut(&mut self) -> &mut InputBuffer {
        &mut self.input
    }

    /// Text merged so far in the current turn.
    pub fn accumulated(&self) -> &str {
        &self.accumulator
    }

    /// The last assistant message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_assistant())
    }

    /// Start a turn for `prompt`.
    ///
    /// Returns `None` without touching state if the prompt is blank or a
    /// generation is already in flight.
    pub fn send(&mut self, prompt: &str) -> Option<Turn> {
        if prompt.trim().is_empty() || !self.is_idle() {
            return None;
        }
        self.messages.push(Message::user(prompt));
        Some(self.begin())
    }

    /// Start a turn for the prompt buffer, clearing it if the turn starts.
    pub fn send_input(&mut self) -> Option<Turn> {
        if self.input.is_blank() || !self.is_idle() {
            return None;
        }
        let prompt = self.input.take();
        self.send(&prompt)
    }

    /// Regenerate the reply at `index`.
    ///
    /// Everything from `index` onward is dropped, then the list is cut to
    /// end at the nearest preceding user message, which is re-sent without
    /// being appended again.  Returns `None` if there is no such message or
    /// a generation is in flight.
    pub fn regenerate(&mut self, index: usize) -> Option<Turn> {
        if !self.is_idle() {
            return None;
        }
        let index = index.min(self.messages.len());
        let prompt = self.messages[..index].iter().rposition(|m| m.is_user())?;
        self.messages.truncate(prompt + 1);
        Some(self.begin())
    }

    /// Send a canned follow-up instruction as a normal prompt.
    pub fn refine(&mut self, refinement: Refinement) -> Option<Turn> {
        self.send(refinement.instruction())
    }

    /// Copy `content` into the prompt buffer for editing.  History is not
    /// modified.
    pub fn edit_user_prompt(&mut self, content: &str) {
        self.input.set_text(content);
    }

    fn begin(&mut self) -> Turn {
        let history = self.messages.clone();
        let placeholder = Message::placeholder();
        let id = placeholder.id.clone();
        self.messages.push(placeholder);
        let cancel = CancellationToken::new();
        self.accumulator.clear();
        self.phase = Phase::Sending;
        self.active = Some(ActiveTurn {
            placeholder: id.clone(),
            cancel: cancel.clone(),
        });
        Turn {
            placeholder: id,
            history,
            cancel,
        }
    }

    fn is_active(&self, placeholder: &MessageId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| &a.placeholder == placeholder && !a.cancel.is_cancelled())
    }

    fn placeholder_mut(&mut self, placeholder: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| &m.id == placeholder)
    }

    /// Merge a fragment into the placeholder.
    ///
    /// The placeholder's content becomes the whole accumulated text.
    /// Fragments for a turn that is no longer active, or whose token has
    /// fired, are dropped.  Returns true if the fragment was merged.
    pub fn apply_fragment(&mut self, placeholder: &MessageId, fragment: &str) -> bool {
        if !self.is_active(placeholder) {
            return false;
        }
        self.accumulator.push_str(fragment);
        let content = self.accumulator.clone();
        let Some(message) = self.placeholder_mut(placeholder) else {
            return false;
        };
        message.content = content;
        self.phase = Phase::Streaming;
        true
    }

    /// Close the turn after the stream is exhausted.  Returns the messages
    /// to flush, or `None` if `placeholder` is not the active turn.
    pub fn finish(&mut self, placeholder: &MessageId) -> Option<&[Message]> {
        match &self.active {
            Some(active) if &active.placeholder == placeholder => {}
            _ => return None,
        }
        self.active = None;
        self.phase = Phase::Idle;
        Some(&self.messages)
    }

    /// Cancel the in-flight turn, keeping whatever was merged.  Returns true
    /// if a turn was in flight.
    pub fn stop(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel.cancel();
        self.phase = Phase::Idle;
        true
    }

    /// Close the turn after a failure, marking the partial reply.
    pub fn fail(&mut self, placeholder: &MessageId) {
        match &self.active {
            Some(active) if &active.placeholder == placeholder => {}
            _ => return,
        }
        self.active = None;
        self.phase = Phase::Idle;
        if let Some(message) = self.placeholder_mut(placeholder) {
            message.content.push_str(ERROR_MARKER);
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
