use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_INTERRUPTIONS,
};
use crate::service::{ChatHandle, INTERRUPTION_NOTICE, ModelService, ReplyStream, SessionRequest};
use crate::sse::process_sse;
use crate::types::{MessageCreateParams, MessageParam, ModelParameters, StreamEvent};

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "CYBERINSTRUCT_API_KEY";

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A stream of reply text pieces, ending at the first error.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streaming client for the Messages API.
///
/// The client is constructed without a credential check so that a missing key degrades
/// at [`ModelService::open_session`] rather than at startup.
#[derive(Debug, Clone)]
pub struct MessagesService {
    api_key: Option<String>,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl MessagesService {
    /// Create a new client with the given credential and default settings.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client reading the credential from `CYBERINSTRUCT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()))
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Returns true if a credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::credential_missing(format!(
                "{API_KEY_ENV} environment variable not set"
            )));
        };
        let api_key = HeaderValue::from_str(api_key).map_err(|_| {
            Error::validation(
                "API key contains characters not allowed in a header",
                Some(API_KEY_ENV.to_string()),
            )
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_API_VERSION),
        );
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("request-id")
            .or_else(|| response.headers().get("x-request-id"))
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let (error_type, error_message, error_param) = match detail {
            Some(detail) => (
                detail.error_type,
                detail.message.unwrap_or_else(|| error_body.clone()),
                detail.param,
            ),
            None => (None, error_body, None),
        };

        match status_code {
            400 => Error::bad_request(error_message, error_param),
            401 | 403 => Error::authentication(error_message),
            404 => Error::not_found(error_message, Some("model".to_string()), None),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }

    /// Send a streaming request and return the reply text as it arrives.
    ///
    /// Non-text events are dropped. An `error` event ends the stream with
    /// [`Error::StreamInterrupted`].
    pub async fn stream_text(&self, params: MessageCreateParams) -> Result<TextStream> {
        let url = format!("{}messages", self.base_url);
        let headers = self.headers()?;

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&params)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let events = process_sse(response.bytes_stream());
        Ok(Box::pin(text_deltas(events)))
    }
}

/// Opening a session checks the credential up front:
///
/// ```
/// # tokio_test::block_on(async {
/// use cyberinstruct::{MessagesService, ModelParameters, ModelService, SessionRequest, Topic};
///
/// let service = MessagesService::new(None)?;
/// let request = SessionRequest::new(Topic::General, ModelParameters::default());
/// let err = service.open_session(request).await.err().unwrap();
/// assert!(err.is_credential_missing());
/// # Ok::<(), cyberinstruct::Error>(())
/// # }).unwrap();
/// ```
#[async_trait::async_trait]
impl ModelService for MessagesService {
    async fn open_session(&self, request: SessionRequest) -> Result<Box<dyn ChatHandle>> {
        // Surface a missing or malformed key now rather than on the first send.
        self.headers()?;
        Ok(Box::new(MessagesChat {
            service: self.clone(),
            system: request.system_instruction(),
            parameters: request.parameters,
            history: Vec::new(),
        }))
    }
}

/// Reduce an event stream to its text, stopping after the first error.
fn text_deltas<S>(events: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<StreamEvent>> + Send,
{
    events
        .filter_map(|event| async move {
            match event {
                Ok(StreamEvent::Error { error }) => Some(Err(Error::stream_interrupted(
                    format!("{}: {}", error.error_type, error.message),
                    None,
                ))),
                Ok(event) => event.into_text().filter(|text| !text.is_empty()).map(Ok),
                Err(e) => Some(Err(e)),
            }
        })
        .scan(false, |failed, item| {
            let item = if *failed {
                None
            } else {
                *failed = item.is_err();
                Some(item)
            };
            async move { item }
        })
}

/// A chat handle backed by [`MessagesService`].
///
/// Completed turns are kept and sent with the next request. A reply that is interrupted
/// is not recorded, so the next request retries from the last complete exchange.
#[derive(Debug)]
pub struct MessagesChat {
    service: MessagesService,
    system: String,
    parameters: ModelParameters,
    history: Vec<MessageParam>,
}

impl MessagesChat {
    /// The turns exchanged so far.
    pub fn history(&self) -> &[MessageParam] {
        &self.history
    }

    /// The system instruction this handle sends.
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Keep a completed exchange. A reply with no text is dropped with its prompt, as
    /// the API refuses empty assistant turns.
    fn record_turn(&mut self, user_text: String, reply: String) {
        if reply.is_empty() {
            tracing::warn!("reply carried no text; not kept in history");
            return;
        }
        self.history.push(MessageParam::user(user_text));
        self.history.push(MessageParam::assistant(reply));
    }
}

enum Reply<'a> {
    Connecting {
        chat: &'a mut MessagesChat,
        user_text: String,
        params: MessageCreateParams,
    },
    Streaming {
        chat: &'a mut MessagesChat,
        user_text: String,
        reply: String,
        text: TextStream,
    },
    Done,
}

/// A short label for why a reply broke off.
fn interruption_cause(err: &Error) -> &'static str {
    if err.is_authentication() {
        "credential rejected"
    } else if err.is_rate_limit() {
        "rate limited"
    } else if err.is_timeout() {
        "timed out"
    } else if err.is_connection() {
        "service unreachable"
    } else if err.is_server_error() {
        "server error"
    } else if err.is_stream_interrupted() {
        "stream broke off"
    } else {
        "request failed"
    }
}

fn interrupted(err: &Error) -> String {
    STREAM_INTERRUPTIONS.click();
    tracing::error!(
        cause = interruption_cause(err),
        status = ?err.status_code(),
        request_id = ?err.request_id(),
        error = %err,
        "reply stream interrupted"
    );
    INTERRUPTION_NOTICE.to_string()
}

impl ChatHandle for MessagesChat {
    fn stream_reply(&mut self, user_text: &str) -> ReplyStream<'_> {
        let mut messages = self.history.clone();
        messages.push(MessageParam::user(user_text));
        let params =
            MessageCreateParams::streaming(&self.parameters, Some(self.system.clone()), messages);
        let state = Reply::Connecting {
            chat: self,
            user_text: user_text.to_string(),
            params,
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            loop {
                state = match state {
                    Reply::Connecting {
                        chat,
                        user_text,
                        params,
                    } => match chat.service.stream_text(params).await {
                        Ok(text) => Reply::Streaming {
                            chat,
                            user_text,
                            reply: String::new(),
                            text,
                        },
                        Err(err) => return Some((interrupted(&err), Reply::Done)),
                    },
                    Reply::Streaming {
                        chat,
                        user_text,
                        mut reply,
                        mut text,
                    } => match text.next().await {
                        Some(Ok(chunk)) => {
                            reply.push_str(&chunk);
                            let state = Reply::Streaming {
                                chat,
                                user_text,
                                reply,
                                text,
                            };
                            return Some((chunk, state));
                        }
                        Some(Err(err)) => return Some((interrupted(&err), Reply::Done)),
                        None => {
                            chat.record_turn(user_text, reply);
                            return None;
                        }
                    },
                    Reply::Done => return None,
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentDelta, StreamError, Topic};

    fn delta(text: &str) -> Result<StreamEvent> {
        Ok(StreamEvent::ContentBlockDelta {
            index: 0,
            delta: ContentDelta::TextDelta {
                text: text.to_string(),
            },
        })
    }

    #[test]
    fn client_creation() {
        let client = MessagesService::new(Some("test-key".to_string()));
        assert!(client.is_ok());
        assert!(client.unwrap().has_credential());
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client =
            MessagesService::with_options(None, Some("http://localhost:8080/v1".into()), None)
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1/");
    }

    #[tokio::test]
    async fn open_session_without_credential() {
        let client = MessagesService::new(None).unwrap();
        let request = SessionRequest::new(Topic::General, ModelParameters::default());
        let err = client.open_session(request).await.err().unwrap();
        assert!(err.is_credential_missing());
    }

    #[tokio::test]
    async fn open_session_rejects_unprintable_key() {
        let client = MessagesService::new(Some("bad\nkey".to_string())).unwrap();
        let request = SessionRequest::new(Topic::General, ModelParameters::default());
        let err = client.open_session(request).await.err().unwrap();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn text_deltas_keep_only_text() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Other),
            delta("Use "),
            delta(""),
            delta("nmap"),
            Ok(StreamEvent::MessageStop),
        ]);
        let text: Vec<String> = text_deltas(events)
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(text, vec!["Use ".to_string(), "nmap".to_string()]);
    }

    #[tokio::test]
    async fn text_deltas_stop_after_error_event() {
        let events = stream::iter(vec![
            delta("partial"),
            Ok(StreamEvent::Error {
                error: StreamError {
                    error_type: "overloaded_error".to_string(),
                    message: "Overloaded".to_string(),
                },
            }),
            delta("never seen"),
        ]);
        let items: Vec<Result<String>> = text_deltas(events).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].as_ref().unwrap_err().is_stream_interrupted());
    }

    #[tokio::test]
    async fn unreachable_server_yields_interruption_notice() {
        let client = MessagesService::with_options(
            Some("test-key".to_string()),
            Some("http://127.0.0.1:9/v1/".to_string()),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        let request = SessionRequest::new(Topic::Defense, ModelParameters::default());
        let mut handle = client.open_session(request).await.unwrap();
        let chunks: Vec<String> = handle.stream_reply("hello").collect().await;
        assert_eq!(chunks, vec![INTERRUPTION_NOTICE.to_string()]);
    }

    #[test]
    fn interruption_cause_by_kind() {
        assert_eq!(
            interruption_cause(&Error::authentication("bad key")),
            "credential rejected"
        );
        assert_eq!(
            interruption_cause(&Error::rate_limit("slow down", Some(5))),
            "rate limited"
        );
        assert_eq!(interruption_cause(&Error::timeout("late", None)), "timed out");
        assert_eq!(
            interruption_cause(&Error::connection("refused", None)),
            "service unreachable"
        );
        assert_eq!(
            interruption_cause(&Error::api(529, None, "overloaded".to_string(), None)),
            "server error"
        );
        assert_eq!(
            interruption_cause(&Error::stream_interrupted("reset", None)),
            "stream broke off"
        );
        assert_eq!(
            interruption_cause(&Error::bad_request("no", None)),
            "request failed"
        );
    }

    /// Serve one event-stream response on a local port and return its base URL.
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/v1/")
    }

    fn chat_against(base_url: String) -> MessagesChat {
        let service = MessagesService::with_options(
            Some("test-key".to_string()),
            Some(base_url),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        MessagesChat {
            service,
            system: "system".to_string(),
            parameters: ModelParameters::default(),
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn completed_reply_is_kept_in_history() {
        let base_url = serve_once(
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\n\n\
             data: {\"type\":\"message_stop\"}\n\n",
        )
        .await;
        let mut chat = chat_against(base_url);
        let chunks: Vec<String> = chat.stream_reply("hi").collect().await;
        assert_eq!(chunks, vec!["ok".to_string()]);
        assert_eq!(
            chat.history(),
            &[MessageParam::user("hi"), MessageParam::assistant("ok")]
        );
    }

    #[tokio::test]
    async fn empty_reply_is_not_kept_in_history() {
        let base_url = serve_once(
            "event: message_start\ndata: {\"type\":\"message_start\"}\n\n\
             event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        )
        .await;
        let mut chat = chat_against(base_url);
        let chunks: Vec<String> = chat.stream_reply("hi").collect().await;
        assert!(chunks.is_empty());
        assert!(chat.history().is_empty());
    }
}
