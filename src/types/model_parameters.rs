use serde::{Deserialize, Serialize};

/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// Default sampling temperature, a balance between creativity and technical accuracy.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default maximum tokens per reply.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Sampling parameters a chat handle is opened with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// The model identifier.
    pub model: String,

    /// Sampling temperature, or the model default when `None`.
    pub temperature: Option<f32>,

    /// Maximum tokens per reply.
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}
