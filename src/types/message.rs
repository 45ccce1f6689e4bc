use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;

use crate::types::Sender;

/// Opaque identifier of a transcript message.
///
/// Identifiers are unique among the messages of one transcript and never change
/// once assigned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Hands out fresh, monotonically increasing message identifiers.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    next: AtomicU64,
}

impl MessageIdGenerator {
    /// Creates a generator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an identifier that has not been handed out before.
    pub fn next_id(&self) -> MessageId {
        MessageId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// One entry of the chat transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Stable identifier.
    pub id: MessageId,

    /// The message body. Grows while `streaming` is set.
    pub text: String,

    /// Author of the message.
    pub sender: Sender,

    /// Creation instant.
    pub timestamp: OffsetDateTime,

    /// True while the reply is still arriving.
    pub streaming: bool,
}

impl Message {
    /// Create a finished message from the given sender.
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: OffsetDateTime::now_utc(),
            streaming: false,
        }
    }

    /// Create a message typed by the operator.
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Sender::User, text)
    }

    /// Create a finished message from the model.
    pub fn ai(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Sender::Ai, text)
    }

    /// Create a session notice.
    pub fn system(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Sender::System, text)
    }

    /// Create the empty, streaming placeholder for an incoming reply.
    pub fn placeholder(id: MessageId) -> Self {
        Self {
            streaming: true,
            ..Self::new(id, Sender::Ai, String::new())
        }
    }
}
