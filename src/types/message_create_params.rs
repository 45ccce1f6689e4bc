use serde::{Deserialize, Serialize};

use crate::types::{MessageParam, ModelParameters};

/// Request body for one streamed reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageCreateParams {
    /// The model identifier.
    pub model: String,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// System instruction: persona plus topic focus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Prior turns followed by the new user turn.
    pub messages: Vec<MessageParam>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Always true; replies are streamed.
    pub stream: bool,
}

impl MessageCreateParams {
    /// Create streaming parameters from model settings, a system instruction and turns.
    pub fn streaming(
        parameters: &ModelParameters,
        system: Option<String>,
        messages: Vec<MessageParam>,
    ) -> Self {
        Self {
            model: parameters.model.clone(),
            max_tokens: parameters.max_tokens,
            system,
            messages,
            temperature: parameters.temperature,
            stream: true,
        }
    }
}
