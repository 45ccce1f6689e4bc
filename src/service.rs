//! The boundary between the session controller and the remote model.
//!
//! A [`ModelService`] opens chat handles scoped to a topic; a [`ChatHandle`] streams the
//! reply to one user turn as a lazy sequence of text chunks. Transport failures never
//! surface as stream errors: a handle yields [`INTERRUPTION_NOTICE`] as its final chunk
//! instead.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;
use crate::persona::{INSTRUCTOR_PERSONA, topic_focus};
use crate::types::{ModelParameters, Topic};

/// Chunk yielded in place of the rest of a reply when the transport fails.
pub const INTERRUPTION_NOTICE: &str =
    "\n[!] Connection interrupted. Uplink unstable. Please verify API key or network status.";

/// A finite, ordered, non-restartable stream of reply text chunks.
pub type ReplyStream<'a> = Pin<Box<dyn Stream<Item = String> + Send + 'a>>;

/// Everything needed to open a chat handle.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    /// The topic the handle is scoped to.
    pub topic: Topic,
    /// Persona text placed ahead of the topic focus.
    pub persona: String,
    /// Sampling parameters.
    pub parameters: ModelParameters,
}

impl SessionRequest {
    /// Create a request for `topic` with the default persona and the given parameters.
    pub fn new(topic: Topic, parameters: ModelParameters) -> Self {
        Self {
            topic,
            persona: INSTRUCTOR_PERSONA.to_string(),
            parameters,
        }
    }

    /// Replace the persona.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// The system instruction: persona, a blank line, then the topic focus.
    pub fn system_instruction(&self) -> String {
        format!("{}\n\n{}", self.persona, topic_focus(self.topic.label()))
    }
}

/// Opens chat handles against a remote model.
#[async_trait::async_trait]
pub trait ModelService: Send + Sync {
    /// Open a handle scoped to the request's topic.
    async fn open_session(&self, request: SessionRequest) -> Result<Box<dyn ChatHandle>>;
}

/// A live conversation with the model.
pub trait ChatHandle: Send {
    /// Stream the reply to `user_text`.
    fn stream_reply(&mut self, user_text: &str) -> ReplyStream<'_>;
}
