//! Session controller tests driven by a scripted in-memory model service.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use futures::stream;

use cyberinstruct::{
    ChatHandle, Error, INTERRUPTION_NOTICE, Message, MessageId, ModelService, Phase, Renderer,
    ReplyStream, Result, Sender, SessionController, SessionRequest, Topic,
};

/// What the fake service saw and what it should do next.
#[derive(Default)]
struct Script {
    requests: Vec<SessionRequest>,
    failures_left: usize,
    replies: VecDeque<Vec<String>>,
    prompts: Vec<String>,
}

#[derive(Clone, Default)]
struct ScriptedService {
    script: Arc<Mutex<Script>>,
}

impl ScriptedService {
    fn new() -> Self {
        Self::default()
    }

    fn failing(times: usize) -> Self {
        let service = Self::new();
        service.script.lock().unwrap().failures_left = times;
        service
    }

    fn reply(self, chunks: &[&str]) -> Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .push_back(chunks.iter().map(|c| c.to_string()).collect());
        self
    }

    fn opened_topics(&self) -> Vec<Topic> {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|r| r.topic)
            .collect()
    }

    fn prompts(&self) -> Vec<String> {
        self.script.lock().unwrap().prompts.clone()
    }
}

struct ScriptedHandle {
    script: Arc<Mutex<Script>>,
}

impl ChatHandle for ScriptedHandle {
    fn stream_reply(&mut self, user_text: &str) -> ReplyStream<'_> {
        let mut script = self.script.lock().unwrap();
        script.prompts.push(user_text.to_string());
        let chunks = script.replies.pop_front().unwrap_or_default();
        Box::pin(stream::iter(chunks))
    }
}

#[async_trait::async_trait]
impl ModelService for ScriptedService {
    async fn open_session(&self, request: SessionRequest) -> Result<Box<dyn ChatHandle>> {
        let mut script = self.script.lock().unwrap();
        let topic = request.topic;
        script.requests.push(request);
        if script.failures_left > 0 {
            script.failures_left -= 1;
            return Err(Error::handle_open(topic.label(), "uplink down", None));
        }
        Ok(Box::new(ScriptedHandle {
            script: Arc::clone(&self.script),
        }))
    }
}

/// Records every notification so tests can check what a display would have seen.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    snapshots: Vec<String>,
}

impl Renderer for Recorder {
    fn transcript_reset(&mut self) {
        self.events.push("reset".to_string());
    }

    fn message_appended(&mut self, message: &Message) {
        self.events
            .push(format!("append {:?} {}", message.sender, message.streaming));
    }

    fn text_updated(&mut self, message: &Message, delta: &str) {
        self.events.push(format!("update {delta}"));
        self.snapshots.push(message.text.clone());
    }

    fn message_finalized(&mut self, message: &Message) {
        self.events.push(format!("finalize {}", message.text));
    }

    fn print_error(&mut self, error: &str) {
        self.events.push(format!("error {error}"));
    }

    fn print_info(&mut self, info: &str) {
        self.events.push(format!("info {info}"));
    }
}

async fn loaded(service: ScriptedService, topic: Topic) -> SessionController<ScriptedService> {
    let mut session = SessionController::new(service);
    session.select_topic(topic, &mut ()).await.unwrap();
    session
}

fn reply_of(session: &SessionController<ScriptedService>, id: MessageId) -> &Message {
    session.transcript().get(id).unwrap()
}

#[tokio::test]
async fn topic_switch_shows_notice_then_greeting() {
    let service = ScriptedService::new();
    let mut session = SessionController::new(service.clone());
    let mut recorder = Recorder::default();
    session
        .select_topic(Topic::WebExploitation, &mut recorder)
        .await
        .unwrap();

    let messages = session.transcript().list();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::System);
    assert_eq!(
        messages[0].text,
        "Initializing environment... Loading Web Exploitation modules..."
    );
    assert_eq!(messages[1].sender, Sender::Ai);
    assert_eq!(messages[1].text, Topic::WebExploitation.greeting());
    assert!(session.phase().is_idle());
    assert!(session.has_handle());
    assert_eq!(
        recorder.events,
        vec!["reset", "append System false", "append Ai false"]
    );
    assert_eq!(service.opened_topics(), vec![Topic::WebExploitation]);
}

#[tokio::test]
async fn topic_switch_replaces_transcript() {
    let service = ScriptedService::new().reply(&["ok"]);
    let mut session = loaded(service, Topic::General).await;
    session.send("hello", &mut ()).await.unwrap();
    assert_eq!(session.transcript().len(), 4);

    session.select_topic(Topic::Defense, &mut ()).await.unwrap();
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.topic(), Topic::Defense);
}

#[tokio::test]
async fn handle_request_carries_persona_and_focus() {
    let service = ScriptedService::new();
    let _session = loaded(service.clone(), Topic::PrivilegeEscalation).await;
    let script = service.script.lock().unwrap();
    let instruction = script.requests[0].system_instruction();
    assert!(instruction.contains("'CyberInstruct'"));
    let focus = "Current Module Focus: Privilege Escalation. \
                 Focus your examples and terminology on this domain.";
    assert!(instruction.ends_with(focus));
    assert_eq!(script.requests[0].parameters.temperature, Some(0.7));
}

#[tokio::test]
async fn reply_grows_by_concatenation_and_finalizes() {
    let service = ScriptedService::new().reply(&["Use ", "`nmap -sV`", " to ", "**fingerprint**."]);
    let mut session = loaded(service.clone(), Topic::Reconnaissance).await;
    let mut recorder = Recorder::default();

    let reply = session
        .send("How do I find service versions?", &mut recorder)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        recorder.snapshots,
        vec![
            "Use ",
            "Use `nmap -sV`",
            "Use `nmap -sV` to ",
            "Use `nmap -sV` to **fingerprint**."
        ]
    );
    for pair in recorder.snapshots.windows(2) {
        assert!(pair[1].starts_with(pair[0].as_str()));
    }
    let message = reply_of(&session, reply);
    assert_eq!(message.text, "Use `nmap -sV` to **fingerprint**.");
    assert!(!message.streaming);
    assert_eq!(message.sender, Sender::Ai);
    assert_eq!(
        recorder.events.first().map(String::as_str),
        Some("append User false")
    );
    assert_eq!(recorder.events[1], "append Ai true");
    assert_eq!(
        recorder.events.last().map(String::as_str),
        Some("finalize Use `nmap -sV` to **fingerprint**.")
    );
    assert_eq!(service.prompts(), vec!["How do I find service versions?"]);
    assert!(session.phase().is_idle());
}

#[tokio::test]
async fn user_message_keeps_raw_input() {
    let service = ScriptedService::new().reply(&["ack"]);
    let mut session = loaded(service, Topic::General).await;
    session.send("  spaced out  ", &mut ()).await.unwrap();
    let user = &session.transcript().list()[2];
    assert_eq!(user.sender, Sender::User);
    assert_eq!(user.text, "  spaced out  ");
}

#[tokio::test]
async fn empty_reply_finalizes_empty_message() {
    let service = ScriptedService::new().reply(&[]);
    let mut session = loaded(service, Topic::General).await;
    let reply = session.send("anything", &mut ()).await.unwrap().unwrap();
    let message = reply_of(&session, reply);
    assert_eq!(message.text, "");
    assert!(!message.streaming);
}

#[tokio::test]
async fn blank_input_is_noop() {
    let service = ScriptedService::new();
    let mut session = loaded(service.clone(), Topic::General).await;
    let before = session.transcript().list().to_vec();
    let mut recorder = Recorder::default();
    assert_eq!(session.send("   ", &mut recorder).await.unwrap(), None);
    assert_eq!(session.send("", &mut recorder).await.unwrap(), None);
    assert_eq!(session.transcript().list(), before.as_slice());
    assert!(recorder.events.is_empty());
    assert!(service.prompts().is_empty());
}

#[tokio::test]
async fn sending_while_busy_leaves_transcript_unchanged() {
    let service = ScriptedService::new();
    let mut session = loaded(service, Topic::General).await;
    let reply = session.begin_send("first", &mut ()).unwrap().unwrap();
    session.fold_chunk("partial", &mut ()).unwrap();
    let before = session.transcript().list().to_vec();

    let err = session.send("second", &mut ()).await.unwrap_err();
    assert!(err.is_busy());
    assert_eq!(session.transcript().list(), before.as_slice());
    assert_eq!(
        session.phase(),
        &Phase::Sending {
            reply_id: reply,
            accumulated: "partial".to_string()
        }
    );

    let err = session
        .select_topic(Topic::Network, &mut ())
        .await
        .unwrap_err();
    assert!(err.is_busy());
    assert_eq!(session.transcript().list(), before.as_slice());
}

#[tokio::test]
async fn busy_submit_keeps_input_buffer() {
    let service = ScriptedService::new();
    let mut session = loaded(service, Topic::General).await;
    session.begin_send("first", &mut ()).unwrap();
    session.set_input("queued question");
    assert!(session.submit(&mut ()).await.unwrap_err().is_busy());
    assert_eq!(session.input(), "queued question");
}

#[tokio::test]
async fn failed_open_falls_back_to_general_once() {
    let service = ScriptedService::failing(1).reply(&["General ", "answer"]);
    let mut session = loaded(service.clone(), Topic::Network).await;
    assert!(!session.has_handle());
    assert_eq!(session.transcript().len(), 2);

    let reply = session.send("ARP spoofing?", &mut ()).await.unwrap().unwrap();
    assert_eq!(service.opened_topics(), vec![Topic::Network, Topic::General]);
    assert_eq!(reply_of(&session, reply).text, "General answer");
    assert!(session.has_handle());
    assert_eq!(session.topic(), Topic::Network);

    // The fallback handle is kept; later sends do not reopen.
    session.send("again?", &mut ()).await.unwrap();
    assert_eq!(service.opened_topics().len(), 2);
    assert_eq!(session.stats().fallback_attempts, 1);
}

#[tokio::test]
async fn failed_fallback_folds_interruption_notice() {
    let service = ScriptedService::failing(usize::MAX);
    let mut session = loaded(service.clone(), Topic::Defense).await;
    let mut recorder = Recorder::default();

    let reply = session
        .send("hello?", &mut recorder)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(service.opened_topics(), vec![Topic::Defense, Topic::General]);
    let message = reply_of(&session, reply);
    assert_eq!(message.text, INTERRUPTION_NOTICE);
    assert!(!message.streaming);
    assert_eq!(recorder.snapshots, vec![INTERRUPTION_NOTICE.to_string()]);

    // Each send makes exactly one new attempt.
    session.send("still there?", &mut ()).await.unwrap();
    assert_eq!(service.opened_topics().len(), 3);
    assert_eq!(session.stats().fallback_attempts, 2);
    assert_eq!(session.stats().handle_open_failures, 3);
}

#[tokio::test]
async fn interrupted_handle_notice_is_folded_like_any_chunk() {
    let service = ScriptedService::new().reply(&["Partial answer", INTERRUPTION_NOTICE]);
    let mut session = loaded(service, Topic::General).await;
    let reply = session.send("explain XSS", &mut ()).await.unwrap().unwrap();
    assert_eq!(
        reply_of(&session, reply).text,
        format!("Partial answer{INTERRUPTION_NOTICE}")
    );
}

#[tokio::test]
async fn reset_reloads_current_topic() {
    let service = ScriptedService::new().reply(&["x"]);
    let mut session = loaded(service.clone(), Topic::WebExploitation).await;
    session.send("q", &mut ()).await.unwrap();
    session.reset(&mut ()).await.unwrap();
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(
        service.opened_topics(),
        vec![Topic::WebExploitation, Topic::WebExploitation]
    );
}

#[tokio::test]
async fn model_changes_apply_to_next_handle() {
    let service = ScriptedService::new();
    let mut session = loaded(service.clone(), Topic::General).await;
    session.set_model("claude-sonnet-4-5");
    session.set_temperature(None);
    session.select_topic(Topic::Network, &mut ()).await.unwrap();
    let script = service.script.lock().unwrap();
    assert_eq!(script.requests[0].parameters.model, "claude-haiku-4-5");
    assert_eq!(script.requests[1].parameters.model, "claude-sonnet-4-5");
    assert_eq!(script.requests[1].parameters.temperature, None);
}

#[tokio::test]
async fn message_ids_are_unique_across_topics() {
    let service = ScriptedService::new().reply(&["a"]).reply(&["b"]);
    let mut session = loaded(service, Topic::General).await;
    let first = session.send("one", &mut ()).await.unwrap().unwrap();
    session.select_topic(Topic::Network, &mut ()).await.unwrap();
    let second = session.send("two", &mut ()).await.unwrap().unwrap();
    assert_ne!(first, second);
    let listed = session.transcript().list();
    let ids: HashSet<MessageId> = listed.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), listed.len());
    assert!(!ids.contains(&first));
}
