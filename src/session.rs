//! The session controller.
//!
//! A [`SessionController`] owns the active topic, the transcript and the chat handle,
//! and moves between the phases of [`Phase`] as topics load and replies stream in. The
//! async operations [`SessionController::select_topic`] and [`SessionController::send`]
//! drive a whole transition; the step operations they are built from are public so an
//! event loop can drive the state machine itself.

use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::observability::{
    SESSION_CHUNKS, SESSION_FALLBACKS, SESSION_HANDLE_OPEN_FAILURES, SESSION_REJECTED,
    SESSION_REPLY_DURATION, SESSION_SENDS, SESSION_TOPIC_SWITCHES,
};
use crate::persona::INSTRUCTOR_PERSONA;
use crate::render::Renderer;
use crate::service::{ChatHandle, INTERRUPTION_NOTICE, ModelService, SessionRequest};
use crate::transcript::Transcript;
use crate::types::{Message, MessageId, MessageIdGenerator, ModelParameters, Topic};

/// What the controller is doing.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Ready for a send or a topic switch.
    Idle,
    /// A chat handle for `topic` is being opened.
    Initializing { topic: Topic },
    /// A reply is streaming into the message `reply_id`.
    Sending {
        reply_id: MessageId,
        accumulated: String,
    },
}

impl Phase {
    /// A short lower-case name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Initializing { .. } => "initializing",
            Phase::Sending { .. } => "sending",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }
}

#[derive(Debug, Default)]
struct Counters {
    topic_switches: u64,
    sends: u64,
    rejected_sends: u64,
    fallback_attempts: u64,
    handle_open_failures: u64,
    chunks: u64,
}

/// Aggregated stats for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The active topic.
    pub topic: Topic,
    /// The current phase name.
    pub phase: &'static str,
    /// Whether a chat handle is open.
    pub has_handle: bool,
    /// The number of messages in the transcript.
    pub message_count: usize,
    /// The parameters the next handle is opened with.
    pub parameters: ModelParameters,
    /// Topic loads, including the initial one.
    pub topic_switches: u64,
    /// Accepted sends.
    pub sends: u64,
    /// Sends refused because the session was busy.
    pub rejected_sends: u64,
    /// Attempts to reopen a handle against the General topic.
    pub fallback_attempts: u64,
    /// Handle opens that failed.
    pub handle_open_failures: u64,
    /// Reply chunks folded into the transcript.
    pub chunks: u64,
}

/// Drives topic switches and sends against a [`ModelService`].
pub struct SessionController<S: ModelService> {
    service: S,
    topic: Topic,
    persona: String,
    parameters: ModelParameters,
    transcript: Transcript,
    handle: Option<Box<dyn ChatHandle>>,
    phase: Phase,
    input: String,
    ids: MessageIdGenerator,
    counters: Counters,
}

impl<S: ModelService> SessionController<S> {
    /// Creates an idle controller on the General topic with an empty transcript.
    ///
    /// Call [`select_topic`](Self::select_topic) to load the first topic.
    pub fn new(service: S) -> Self {
        Self {
            service,
            topic: Topic::default(),
            persona: INSTRUCTOR_PERSONA.to_string(),
            parameters: ModelParameters::default(),
            transcript: Transcript::new(),
            handle: None,
            phase: Phase::Idle,
            input: String::new(),
            ids: MessageIdGenerator::new(),
            counters: Counters::default(),
        }
    }

    /// Sets the model parameters used for handles opened from now on.
    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Replaces the persona used for handles opened from now on.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    /// Changes the model for handles opened from now on.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.parameters.model = model.into();
    }

    /// Changes the temperature for handles opened from now on.
    pub fn set_temperature(&mut self, temperature: Option<f32>) {
        self.parameters.temperature = temperature;
    }

    /// The pending input buffer.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replaces the pending input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            topic: self.topic,
            phase: self.phase.name(),
            has_handle: self.handle.is_some(),
            message_count: self.transcript.len(),
            parameters: self.parameters.clone(),
            topic_switches: self.counters.topic_switches,
            sends: self.counters.sends,
            rejected_sends: self.counters.rejected_sends,
            fallback_attempts: self.counters.fallback_attempts,
            handle_open_failures: self.counters.handle_open_failures,
            chunks: self.counters.chunks,
        }
    }

    fn request(&self, topic: Topic) -> SessionRequest {
        SessionRequest::new(topic, self.parameters.clone()).with_persona(self.persona.clone())
    }

    fn append(&mut self, message: Message, renderer: &mut dyn Renderer) -> Result<MessageId> {
        let id = message.id;
        self.transcript.append(message)?;
        if let Some(message) = self.transcript.get(id) {
            renderer.message_appended(message);
        }
        Ok(id)
    }

    ////////////////////////////////////////// Topics //////////////////////////////////////////

    /// Switch to `topic`: reload the transcript and open a fresh handle.
    ///
    /// Also used for the initial load. Refused while a reply is streaming.
    pub async fn select_topic(&mut self, topic: Topic, renderer: &mut dyn Renderer) -> Result<()> {
        let request = self.begin_topic(topic, renderer)?;
        let opened = self.service.open_session(request).await;
        self.complete_topic(topic, opened, renderer)?;
        Ok(())
    }

    /// Re-run initialization of the active topic.
    pub async fn reset(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        self.select_topic(self.topic, renderer).await
    }

    /// First half of a topic switch.
    ///
    /// Clears the transcript, drops the current handle, appends the initialization
    /// notice and enters [`Phase::Initializing`]. Returns the request to open the new
    /// handle with.
    pub fn begin_topic(
        &mut self,
        topic: Topic,
        renderer: &mut dyn Renderer,
    ) -> Result<SessionRequest> {
        if let Phase::Sending { .. } = self.phase {
            return Err(Error::busy("switch topic", self.phase.name()));
        }
        debug!(topic = %topic, "initializing topic");
        SESSION_TOPIC_SWITCHES.click();
        self.counters.topic_switches += 1;

        self.transcript.reset();
        renderer.transcript_reset();
        self.topic = topic;
        self.handle = None;
        let notice = Message::system(self.ids.next_id(), topic.initialization_notice());
        self.append(notice, renderer)?;
        self.phase = Phase::Initializing { topic };
        Ok(self.request(topic))
    }

    /// Second half of a topic switch.
    ///
    /// Stores the opened handle, or logs the failure and keeps none, then appends the
    /// topic greeting and returns to [`Phase::Idle`]. A completion for a topic that is
    /// no longer being initialized is ignored and reported as `false`.
    pub fn complete_topic(
        &mut self,
        topic: Topic,
        opened: Result<Box<dyn ChatHandle>>,
        renderer: &mut dyn Renderer,
    ) -> Result<bool> {
        if self.phase != (Phase::Initializing { topic }) {
            debug!(topic = %topic, phase = self.phase.name(), "ignoring stale topic completion");
            return Ok(false);
        }
        match opened {
            Ok(handle) => self.handle = Some(handle),
            Err(err) => {
                SESSION_HANDLE_OPEN_FAILURES.click();
                self.counters.handle_open_failures += 1;
                warn!(topic = %topic, error = %err, "could not open chat handle");
            }
        }
        let greeting = Message::ai(self.ids.next_id(), topic.greeting());
        self.append(greeting, renderer)?;
        self.phase = Phase::Idle;
        debug!(topic = %topic, has_handle = self.handle.is_some(), "topic ready");
        Ok(true)
    }

    ////////////////////////////////////////// Sending /////////////////////////////////////////

    /// Send the pending input buffer.
    ///
    /// The buffer is cleared once the send is accepted and kept when it is refused.
    pub async fn submit(&mut self, renderer: &mut dyn Renderer) -> Result<Option<MessageId>> {
        let text = self.input.clone();
        self.send(&text, renderer).await
    }

    /// Send `text` and stream the reply into the transcript.
    ///
    /// Returns the id of the reply, or `None` when `text` is blank. When no handle is
    /// open, one reopen against the General topic is attempted; if that fails too, the
    /// reply is the interruption notice.
    pub async fn send(
        &mut self,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<MessageId>> {
        let Some(reply_id) = self.begin_send(text, renderer)? else {
            return Ok(None);
        };
        if self.handle.is_none() {
            self.open_fallback().await;
        }

        let start = Instant::now();
        let folded = match self.handle.take() {
            Some(mut handle) => {
                let mut folded = Ok(());
                let mut reply = handle.stream_reply(text);
                while let Some(chunk) = reply.next().await {
                    folded = self.fold_chunk(&chunk, renderer);
                    if folded.is_err() {
                        break;
                    }
                }
                drop(reply);
                self.handle = Some(handle);
                folded
            }
            None => self.fold_chunk(INTERRUPTION_NOTICE, renderer),
        };
        SESSION_REPLY_DURATION.add(start.elapsed().as_secs_f64());

        let finished = self.finish_send(renderer);
        folded?;
        finished?;
        Ok(Some(reply_id))
    }

    async fn open_fallback(&mut self) {
        SESSION_FALLBACKS.click();
        self.counters.fallback_attempts += 1;
        warn!(topic = %self.topic, "no chat handle; reopening against {}", Topic::General);
        match self.service.open_session(self.request(Topic::General)).await {
            Ok(handle) => self.handle = Some(handle),
            Err(err) => {
                SESSION_HANDLE_OPEN_FAILURES.click();
                self.counters.handle_open_failures += 1;
                warn!(error = %err, "fallback chat handle could not be opened");
            }
        }
    }

    /// First step of a send.
    ///
    /// Blank input is a no-op returning `None`. Outside [`Phase::Idle`] the send is
    /// refused with a busy error and nothing changes. Otherwise appends the user
    /// message, clears the input buffer, appends a streaming placeholder and enters
    /// [`Phase::Sending`].
    pub fn begin_send(
        &mut self,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<MessageId>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if !self.phase.is_idle() {
            SESSION_REJECTED.click();
            self.counters.rejected_sends += 1;
            return Err(Error::busy("send", self.phase.name()));
        }
        SESSION_SENDS.click();
        self.counters.sends += 1;

        self.append(Message::user(self.ids.next_id(), text), renderer)?;
        self.input.clear();
        let reply_id = self.append(Message::placeholder(self.ids.next_id()), renderer)?;
        self.phase = Phase::Sending {
            reply_id,
            accumulated: String::new(),
        };
        debug!(reply = %reply_id, "sending");
        Ok(Some(reply_id))
    }

    /// Fold one reply chunk into the streaming message.
    pub fn fold_chunk(&mut self, chunk: &str, renderer: &mut dyn Renderer) -> Result<()> {
        let Phase::Sending {
            reply_id,
            accumulated,
        } = &mut self.phase
        else {
            return Err(Error::validation(
                format!("no reply is streaming while {}", self.phase.name()),
                None,
            ));
        };
        let reply_id = *reply_id;
        accumulated.push_str(chunk);
        self.transcript.update_text(reply_id, accumulated.as_str())?;
        SESSION_CHUNKS.click();
        self.counters.chunks += 1;
        if let Some(message) = self.transcript.get(reply_id) {
            renderer.text_updated(message, chunk);
        }
        Ok(())
    }

    /// Finalize the streaming message and return to [`Phase::Idle`].
    pub fn finish_send(&mut self, renderer: &mut dyn Renderer) -> Result<MessageId> {
        let Phase::Sending { reply_id, .. } = self.phase else {
            return Err(Error::validation(
                format!("no reply is streaming while {}", self.phase.name()),
                None,
            ));
        };
        self.phase = Phase::Idle;
        self.transcript.finalize(reply_id)?;
        if let Some(message) = self.transcript.get(reply_id) {
            renderer.message_finalized(message);
        }
        debug!(reply = %reply_id, "reply finished");
        Ok(reply_id)
    }
}
