use serde::{Deserialize, Serialize};

/// An event in a streamed reply.
///
/// Only the events that carry reply text or end the stream are modeled; everything
/// else deserializes to [`StreamEvent::Other`] and is skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental update to a content block.
    ContentBlockDelta {
        /// Index of the content block being updated.
        index: usize,
        /// The update itself.
        delta: ContentDelta,
    },

    /// Marks the end of the message stream.
    MessageStop,

    /// The server aborted the stream.
    Error {
        /// Details of the failure.
        error: StreamError,
    },

    /// Keep-alives, message metadata and block boundaries.
    #[serde(other)]
    Other,
}

/// The payload of a content block delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    /// A piece of reply text.
    TextDelta {
        /// The text content.
        text: String,
    },

    /// Thinking, signatures and tool input; not shown in the transcript.
    #[serde(other)]
    Other,
}

/// Error details carried by an `error` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamError {
    /// Error type string from the API.
    #[serde(rename = "type")]
    pub error_type: String,

    /// Human-readable error message.
    pub message: String,
}

impl StreamEvent {
    /// Returns the reply text carried by this event, if any.
    pub fn into_text(self) -> Option<String> {
        match self {
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta { text },
                ..
            } => Some(text),
            _ => None,
        }
    }
}
