//! The ordered in-memory list of messages in the active session.

use crate::error::{Error, Result};
use crate::types::{Message, MessageId};

/// Ordered messages keyed by stable identifiers.
///
/// Invariants upheld by every mutating operation:
///
/// - identifiers are unique;
/// - at most one message is streaming;
/// - a streaming message's text only grows by appending;
/// - a finalized message never changes.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every message.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Append `message` to the end of the transcript.
    pub fn append(&mut self, message: Message) -> Result<()> {
        if self.position(message.id).is_some() {
            return Err(Error::validation(
                format!("duplicate message id {}", message.id),
                Some("id".to_string()),
            ));
        }
        if message.streaming
            && let Some(current) = self.streaming()
        {
            return Err(Error::validation(
                format!(
                    "cannot append streaming message {} while {} is streaming",
                    message.id, current.id
                ),
                Some("streaming".to_string()),
            ));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Replace the text of the streaming message `id` with `text`.
    ///
    /// `text` must extend the current text.
    pub fn update_text(&mut self, id: MessageId, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        let message = self.get_mut(id)?;
        if !message.streaming {
            return Err(Error::validation(
                format!("message {id} is finalized"),
                Some("id".to_string()),
            ));
        }
        if !text.starts_with(message.text.as_str()) {
            return Err(Error::validation(
                format!("update to message {id} does not extend its text"),
                Some("text".to_string()),
            ));
        }
        message.text = text;
        Ok(())
    }

    /// Clear the streaming flag of `id`. Finalizing twice is harmless.
    pub fn finalize(&mut self, id: MessageId) -> Result<()> {
        self.get_mut(id)?.streaming = false;
        Ok(())
    }

    /// The messages in order.
    pub fn list(&self) -> &[Message] {
        &self.messages
    }

    /// Look up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.position(id).map(|idx| &self.messages[idx])
    }

    /// The message currently streaming, if any.
    pub fn streaming(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.streaming)
    }

    /// The last message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Result<&mut Message> {
        match self.position(id) {
            Some(idx) => Ok(&mut self.messages[idx]),
            None => Err(Error::not_found(
                format!("no message with id {id}"),
                Some("message".to_string()),
                Some(id.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageIdGenerator, Sender};

    fn fixture() -> (Transcript, MessageIdGenerator) {
        (Transcript::new(), MessageIdGenerator::new())
    }

    #[test]
    fn append_preserves_order() {
        let (mut transcript, ids) = fixture();
        transcript
            .append(Message::system(ids.next_id(), "boot"))
            .unwrap();
        transcript.append(Message::ai(ids.next_id(), "hi")).unwrap();
        transcript
            .append(Message::user(ids.next_id(), "scan?"))
            .unwrap();
        let senders: Vec<Sender> = transcript.list().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::System, Sender::Ai, Sender::User]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let (mut transcript, ids) = fixture();
        let id = ids.next_id();
        transcript.append(Message::user(id, "one")).unwrap();
        let err = transcript.append(Message::user(id, "two")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.list()[0].text, "one");
    }

    #[test]
    fn second_streaming_message_is_rejected() {
        let (mut transcript, ids) = fixture();
        transcript
            .append(Message::placeholder(ids.next_id()))
            .unwrap();
        let err = transcript
            .append(Message::placeholder(ids.next_id()))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn streaming_allowed_after_finalize() {
        let (mut transcript, ids) = fixture();
        let first = ids.next_id();
        transcript.append(Message::placeholder(first)).unwrap();
        transcript.finalize(first).unwrap();
        transcript
            .append(Message::placeholder(ids.next_id()))
            .unwrap();
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn update_grows_by_concatenation() {
        let (mut transcript, ids) = fixture();
        let id = ids.next_id();
        transcript.append(Message::placeholder(id)).unwrap();
        transcript.update_text(id, "Run ").unwrap();
        transcript.update_text(id, "Run `nmap`").unwrap();
        assert_eq!(transcript.get(id).unwrap().text, "Run `nmap`");
        assert!(transcript.get(id).unwrap().streaming);
    }

    #[test]
    fn update_must_extend() {
        let (mut transcript, ids) = fixture();
        let id = ids.next_id();
        transcript.append(Message::placeholder(id)).unwrap();
        transcript.update_text(id, "abc").unwrap();
        let err = transcript.update_text(id, "abd").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transcript.get(id).unwrap().text, "abc");
    }

    #[test]
    fn update_after_finalize_is_rejected() {
        let (mut transcript, ids) = fixture();
        let id = ids.next_id();
        transcript.append(Message::placeholder(id)).unwrap();
        transcript.update_text(id, "done").unwrap();
        transcript.finalize(id).unwrap();
        let err = transcript.update_text(id, "done!").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transcript.get(id).unwrap().text, "done");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (mut transcript, ids) = fixture();
        let missing = ids.next_id();
        assert!(transcript.update_text(missing, "x").unwrap_err().is_not_found());
        assert!(transcript.finalize(missing).unwrap_err().is_not_found());
        assert!(transcript.get(missing).is_none());
    }

    #[test]
    fn finalize_is_idempotent() {
        let (mut transcript, ids) = fixture();
        let id = ids.next_id();
        transcript.append(Message::placeholder(id)).unwrap();
        transcript.finalize(id).unwrap();
        transcript.finalize(id).unwrap();
        assert!(transcript.streaming().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let (mut transcript, ids) = fixture();
        transcript.append(Message::user(ids.next_id(), "a")).unwrap();
        transcript
            .append(Message::placeholder(ids.next_id()))
            .unwrap();
        transcript.reset();
        assert!(transcript.is_empty());
        assert!(transcript.streaming().is_none());
        assert!(transcript.last().is_none());
    }
}
