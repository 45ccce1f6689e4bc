//! Server-Sent Events (SSE) processing for streamed replies.
//!
//! Converts the raw byte stream of an HTTP response into parsed [`StreamEvent`]s. Events
//! are delimited by a blank line; only their `data:` lines are significant because every
//! payload carries its own `type` tag.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_EVENTS};
use crate::types::StreamEvent;
use crate::{Error, Result};

/// Process a stream of bytes into a stream of server-sent events.
///
/// Bytes are buffered until a full event is available, so chunk boundaries may fall
/// anywhere, including inside a multi-byte character.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    let stream = byte_stream.map(|result| {
        result.map_err(|e| {
            Error::stream_interrupted(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
        })
    });
    process_events(stream)
}

fn process_events<S>(stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send + 'static,
{
    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                if let Some((event, remaining)) = extract_event(&buffer) {
                    buffer = remaining;
                    match event {
                        Some(event) => return Some((event, (stream, buffer))),
                        None => continue,
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend(bytes.iter().filter(|&&b| b != b'\r'));
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, Vec::new())));
                    }
                    None => {
                        // A final event may lack its trailing blank line.
                        if !buffer.is_empty() {
                            buffer.extend_from_slice(b"\n\n");
                            if let Some((Some(event), _)) = extract_event(&buffer) {
                                return Some((event, (stream, Vec::new())));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract one complete event from the front of `buffer`.
///
/// Returns `None` when no complete event is buffered yet. The inner option is `None` for
/// events that carry no data, such as comments.
fn extract_event(buffer: &[u8]) -> Option<(Option<Result<StreamEvent>>, Vec<u8>)> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let rest = buffer[end + 2..].to_vec();
    let block = match std::str::from_utf8(&buffer[..end]) {
        Ok(block) => block,
        Err(e) => return Some((Some(Err(e.into())), rest)),
    };

    let data: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect();
    if data.is_empty() {
        return Some((None, rest));
    }
    STREAM_EVENTS.click();
    let event = serde_json::from_str::<StreamEvent>(&data.join("\n")).map_err(Error::from);
    Some((Some(event), rest))
}
