//! Server-Sent Events decoding for streamed completions.

use std::collections::VecDeque;
use std::fmt::Display;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;

use crate::domain::DomainError;

/// Terminator sent by OpenAI-compatible APIs after the last chunk.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    pub fn is_done(&self) -> bool {
        self.data.trim() == DONE_SENTINEL
    }

    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_str(&self.data).map_err(|e| {
            DomainError::parse(format!("Invalid stream chunk: {e}: {}", self.data))
        })
    }
}

/// Incremental SSE parser. Feed it arbitrary byte chunks; complete events come out.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => events.extend(self.end_line()),
                b'\r' => {
                    self.skip_lf = true;
                    events.extend(self.end_line());
                }
                _ => self.line.push(byte),
            }
        }
        events
    }

    /// Flush whatever is buffered once the byte stream ends.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.line.is_empty() {
            if let Some(event) = self.end_line() {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn end_line(&mut self) -> Option<SseEvent> {
        let raw = std::mem::take(&mut self.line);
        let line = String::from_utf8_lossy(&raw);

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(i) => {
                let value = &line[i + 1..];
                (&line[..i], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line.as_ref(), ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
            id,
        })
    }
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    finished: bool,
}

/// Decode a byte stream into SSE events.
pub fn decode_sse<S, E>(bytes: S) -> BoxStream<'static, Result<SseEvent, DomainError>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display,
{
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((Ok(event), st));
            }
            if st.finished {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(&chunk);
                    st.pending.extend(events);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((
                        Err(DomainError::transport(format!("Stream read failed: {e}"))),
                        st,
                    ));
                }
                None => {
                    st.finished = true;
                    if let Some(event) = st.decoder.finish() {
                        st.pending.push_back(event);
                    }
                }
            }
        }
    })
    .boxed()
}

pub fn sse_events(response: reqwest::Response) -> BoxStream<'static, Result<SseEvent, DomainError>> {
    decode_sse(response.bytes_stream().boxed())
}

/// Parse each event's data as JSON, ending quietly at `[DONE]`.
pub fn json_chunks<T>(
    events: BoxStream<'static, Result<SseEvent, DomainError>>,
) -> BoxStream<'static, Result<T, DomainError>>
where
    T: DeserializeOwned + Send + 'static,
{
    events
        .take_while(|item| {
            let done = matches!(item, Ok(event) if event.is_done());
            futures_util::future::ready(!done)
        })
        .map(|item| item.and_then(|event| event.parse_data::<T>()))
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.push(chunk));
        }
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn parses_simple_events() {
        let events = decode_all(&[b"data: {\"a\":1}\n\ndata: [DONE]\n\n"]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert!(events[1].is_done());
    }

    #[test]
    fn handles_lines_split_across_chunks() {
        let events = decode_all(&[b"da", b"ta: hel", b"lo\r", b"\n\r\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn joins_multiline_data_and_keeps_event_name() {
        let events = decode_all(&[b"event: message_delta\ndata: one\ndata:two\nid: 7\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_delta"));
        assert_eq!(events[0].data, "one\ntwo");
        assert_eq!(events[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn ignores_comments_and_dataless_events() {
        let events = decode_all(&[b": keep-alive\n\nevent: ping\n\ndata: x\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
        assert_eq!(events[0].event, None);
    }

    #[test]
    fn flushes_trailing_event_without_blank_line() {
        let events = decode_all(&[b"data: last"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "last");
    }

    #[test]
    fn keeps_multibyte_characters_split_between_chunks() {
        let text = "data: héllo\n\n".as_bytes();
        let (a, b) = text.split_at(8);
        let events = decode_all(&[a, b]);
        assert_eq!(events[0].data, "héllo");
    }

    #[tokio::test]
    async fn json_chunks_stop_at_done() {
        let body: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"n\":1}\n\n")),
            Ok(Bytes::from_static(b"data: {\"n\":2}\n\ndata: [DONE]\n\n")),
            Ok(Bytes::from_static(b"data: {\"n\":3}\n\n")),
        ];
        let events = decode_sse(stream::iter(body));
        let values: Vec<serde_json::Value> = json_chunks(events)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["n"], 2);
    }

    #[tokio::test]
    async fn byte_stream_errors_surface_as_transport_errors() {
        let body: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: ok\n\n")),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
        ];
        let items: Vec<_> = decode_sse(stream::iter(body)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(DomainError::Transport(_))));
    }
}
