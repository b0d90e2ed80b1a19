//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::store::default_data_dir;
use crate::stream::{DEFAULT_SYSTEM_INSTRUCTION, GenerationParams};
use crate::types::Model;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default top-k sampling limit.
pub const DEFAULT_TOP_K: u32 = 40;

/// Default nucleus sampling cutoff.
pub const DEFAULT_TOP_P: f32 = 0.95;

/// Command-line arguments for the g9-chat tool.
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-3-flash-preview)", "MODEL")]
    pub model: Option<String>,

    /// System instruction replacing the built-in persona.
    #[arrrg(optional, "System instruction (empty to send none)", "PROMPT")]
    pub system: Option<String>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// Nucleus sampling cutoff.
    #[arrrg(optional, "Top-p (default: 0.95)", "P")]
    pub top_p: Option<String>,

    /// Top-k sampling limit.
    #[arrrg(optional, "Top-k (default: 40)", "K")]
    pub top_k: Option<u32>,

    /// Upper bound on generated tokens.
    #[arrrg(optional, "Max output tokens per response", "TOKENS")]
    pub max_output_tokens: Option<u32>,

    /// Directory holding saved sessions.
    #[arrrg(optional, "Session directory (default: $G9_DATA_DIR or ~/.g9chat)", "DIR")]
    pub data_dir: Option<String>,

    /// API key, overriding the environment.
    #[arrrg(optional, "API key (default: $GEMINI_API_KEY or $API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// Alternate API endpoint.
    #[arrrg(optional, "API base URL", "URL")]
    pub base_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Persona instruction; `None` sends none.
    pub system_instruction: Option<String>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Top-p nucleus sampling value.
    pub top_p: Option<f32>,

    /// Top-k sampling limit.
    pub top_k: Option<u32>,

    /// Upper bound on generated tokens.
    pub max_output_tokens: Option<u32>,

    /// Directory holding saved sessions; `None` resolves from the environment.
    pub data_dir: Option<PathBuf>,

    /// API key; `None` resolves from the environment.
    pub api_key: Option<String>,

    /// Alternate API endpoint.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-3-flash-preview
    /// - Persona: the G9 system instruction
    /// - Temperature 0.7, top-k 40, top-p 0.95
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_instruction: Some(DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            temperature: Some(DEFAULT_TEMPERATURE),
            top_p: Some(DEFAULT_TOP_P),
            top_k: Some(DEFAULT_TOP_K),
            max_output_tokens: None,
            data_dir: None,
            api_key: None,
            base_url: None,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets or clears the system instruction.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the top-k value.
    pub fn with_top_k(mut self, top_k: Option<u32>) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the output token limit.
    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Sets the session directory.
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        self.data_dir = data_dir;
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The parameters sent with every generation request.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            system_instruction: self.system_instruction.clone(),
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
        }
    }

    /// The session directory, falling back to the environment.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(default_data_dir)
    }

    /// A human-readable summary for `/config`.
    pub fn describe(&self) -> String {
        fn or_default<T: std::fmt::Display>(value: Option<T>) -> String {
            value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(model default)".to_string())
        }
        let data_dir = self
            .resolved_data_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "(in memory)".to_string());
        format!(
            "model: {}\nsystem instruction: {}\ntemperature: {}\ntop_p: {}\ntop_k: {}\nmax output tokens: {}\ndata dir: {}\ncolor: {}",
            self.model,
            if self.system_instruction.is_some() { "set" } else { "none" },
            or_default(self.temperature),
            or_default(self.top_p),
            or_default(self.top_k),
            or_default(self.max_output_tokens),
            data_dir,
            if self.use_color { "on" } else { "off" },
        )
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_unit(param: &str, value: Option<String>, max: f32) -> Result<Option<f32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<f32>() {
        Ok(v) if (0.0..=max).contains(&v) => Ok(Some(v)),
        _ => Err(Error::validation(
            format!("expected a number between 0 and {max}, got {value:?}"),
            Some(param.to_string()),
        )),
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let defaults = ChatConfig::new();
        let temperature = parse_unit("--temperature", args.temperature, 2.0)?;
        let top_p = parse_unit("--top-p", args.top_p, 1.0)?;
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or(defaults.model.clone());
        let system_instruction = match args.system {
            Some(system) if system.trim().is_empty() => None,
            Some(system) => Some(system),
            None => defaults.system_instruction.clone(),
        };

        Ok(ChatConfig {
            model,
            system_instruction,
            temperature: temperature.or(defaults.temperature),
            top_p: top_p.or(defaults.top_p),
            top_k: args.top_k.or(defaults.top_k),
            max_output_tokens: args.max_output_tokens,
            data_dir: args.data_dir.map(PathBuf::from),
            api_key: args.api_key,
            base_url: args.base_url,
            use_color: !args.no_color,
        })
    }
}
