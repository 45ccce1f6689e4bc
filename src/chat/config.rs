//! Configuration types for the terminal front-end.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the binary runs with.

use std::str::FromStr;

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::types::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, ModelParameters, Topic,
};

/// Command-line arguments for the cyberinstruct tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: claude-haiku-4-5)", "MODEL")]
    pub model: Option<String>,

    /// Topic module to load first.
    #[arrrg(optional, "Initial module: name or number (default: general)", "TOPIC")]
    pub topic: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 4096)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Override for the API base URL.
    #[arrrg(optional, "API base URL (default: https://api.anthropic.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Print replies only once they are complete.
    #[arrrg(flag, "Print replies when complete instead of as they stream")]
    pub no_live: bool,

    /// Log at debug level.
    #[arrrg(flag, "Verbose logging to stderr")]
    pub verbose: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: String,

    /// Sampling temperature; `None` uses the model default.
    pub temperature: Option<f32>,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// The topic loaded at startup.
    pub topic: Topic,

    /// Override for the API base URL.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether replies are printed chunk by chunk.
    pub live: bool,

    /// Whether debug logging is enabled.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: claude-haiku-4-5
    /// - Temperature: 0.7
    /// - Max tokens: 4096
    /// - Topic: General
    /// - Color and live streaming: enabled
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: DEFAULT_MAX_TOKENS,
            topic: Topic::General,
            base_url: None,
            use_color: true,
            live: true,
            verbose: false,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the initial topic.
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
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

    /// Prints replies only once complete.
    pub fn without_live(mut self) -> Self {
        self.live = false;
        self
    }

    /// The parameters chat handles are opened with.
    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let topic = match args.topic.as_deref() {
            Some(topic) => {
                Topic::from_str(topic).map_err(|e| Error::validation(e, Some("topic".into())))?
            }
            None => Topic::General,
        };
        if args.max_tokens == Some(0) {
            return Err(Error::validation(
                "max tokens must be positive",
                Some("max-tokens".into()),
            ));
        }

        Ok(ChatConfig {
            model: args.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: args.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            topic,
            base_url: args.base_url,
            use_color: !args.no_color,
            live: !args.no_live,
            verbose: args.verbose,
            ..ChatConfig::new()
        })
    }
}
