//! The fragment stream contract between the conversation and the model.
//!
//! A [`FragmentSource`] turns a conversation history into a lazy, finite
//! sequence of text fragments.  Concatenating the fragments in arrival order
//! reconstructs the assistant's reply.  The sequence is not restartable:
//!
//! - when the [`CancellationToken`] fires the sequence ends immediately,
//!   without an error and without yielding anything that was still in
//!   flight;
//! - any other failure is yielded once as an `Err` after zero or more
//!   fragments, and then the sequence ends.

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::client::Gemini;
use crate::observability::{STREAM_CANCELLED, STREAM_ERRORS, STREAM_FRAGMENTS};
use crate::types::{GenerateContentRequest, GenerationConfig, Message, Model};
use crate::{Error, Result};

/// Persona instruction sent with every request.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are G9 AI, a premium senior AI developer assistant. You provide concise, high-quality code and architectural advice. Your tone is professional, sophisticated, and helpful. Format your code blocks cleanly.";

/// A lazily produced sequence of text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Something that can stream a new assistant turn for a history.
pub trait FragmentSource {
    /// Start generating a reply to `history`.
    ///
    /// No network activity happens until the returned stream is polled.
    fn generate(&self, history: &[Message], cancel: CancellationToken) -> FragmentStream;
}

/// Model and sampling parameters for a generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// The model to generate with.
    pub model: Model,
    /// Persona instruction; `None` sends none.
    pub system_instruction: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Top-k sampling limit.
    pub top_k: Option<u32>,
    /// Nucleus sampling cutoff.
    pub top_p: Option<f32>,
    /// Upper bound on generated tokens.
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: Model::default(),
            system_instruction: Some(DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            temperature: Some(0.7),
            top_k: Some(40),
            top_p: Some(0.95),
            max_output_tokens: None,
        }
    }
}

impl GenerationParams {
    /// Build the request body for `history`.
    pub fn request(&self, history: &[Message]) -> GenerateContentRequest {
        GenerateContentRequest::from_history(history)
            .with_system_instruction(self.system_instruction.as_deref())
            .with_generation_config(GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                max_output_tokens: self.max_output_tokens,
            })
    }
}

/// A [`FragmentSource`] backed by the Gemini streaming endpoint.
#[derive(Debug, Clone)]
pub struct GeminiSource {
    client: Gemini,
    params: GenerationParams,
}

impl GeminiSource {
    /// Wrap a client with the parameters used for every turn.
    pub fn new(client: Gemini, params: GenerationParams) -> Self {
        Self { client, params }
    }

    /// The parameters sent with every request.
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }
}

impl FragmentSource for GeminiSource {
    fn generate(&self, history: &[Message], cancel: CancellationToken) -> FragmentStream {
        let client = self.client.clone();
        let model = self.params.model.clone();
        let request = self.params.request(history);
        let chunks = stream::once(async move { client.stream(&model, &request).await })
            .try_flatten()
            .try_filter_map(|chunk| async move {
                if let Some(reason) = chunk.block_reason() {
                    return Err(Error::blocked(reason));
                }
                Ok(chunk.text())
            });
        cancellable(chunks, cancel)
    }
}

/// Wrap a fragment stream so it honors `cancel` and ends after an error.
///
/// The token is checked before every fragment is yielded and raced against
/// every read, so a fragment that arrives after cancellation is dropped.
/// [`Error::Abort`] from the inner stream is treated as cancellation.
pub fn cancellable<S>(inner: S, cancel: CancellationToken) -> FragmentStream
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    let inner = Box::pin(inner);
    Box::pin(stream::unfold(
        (inner, cancel, false),
        |(mut inner, cancel, done)| async move {
            if done || cancel.is_cancelled() {
                return None;
            }
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = inner.next() => item,
            };
            match next {
                _ if cancel.is_cancelled() => {
                    STREAM_CANCELLED.click();
                    tracing::debug!("generation cancelled");
                    None
                }
                Some(Ok(fragment)) => {
                    STREAM_FRAGMENTS.click();
                    Some((Ok(fragment), (inner, cancel, false)))
                }
                Some(Err(err)) if err.is_abort() => None,
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    Some((Err(err), (inner, cancel, true)))
                }
                None => None,
            }
        },
    ))
}
