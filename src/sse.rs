//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of a `streamGenerateContent?alt=sse`
//! response into a stream of [`GenerateContentResponse`] chunks, handling
//! buffering across network reads, CRLF and bare CR line endings and multi-line `data:`
//! fields.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_EVENTS};
use crate::types::GenerateContentResponse;
use crate::{Error, Result};

/// Process a stream of bytes into a stream of decoded response chunks.
///
/// Events without a `data:` field (comments, keep-alives) are skipped.  A
/// transport error is yielded once and ends the stream.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });
    decode_events(stream)
}

/// Decode SSE framing from an already error-mapped byte stream.
pub(crate) fn decode_events<S>(stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    stream::unfold(
        (stream, Vec::<u8>::new(), false, false),
        move |(mut stream, mut buffer, mut after_cr, finished)| async move {
            if finished {
                return None;
            }
            loop {
                // First check if we have a complete event in the buffer
                while let Some(event_bytes) = take_event(&mut buffer) {
                    if let Some(event) = parse_event(&event_bytes) {
                        return Some((event, (stream, buffer, after_cr, false)));
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        after_cr = push_normalized(&mut buffer, &bytes, after_cr);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, after_cr, true)));
                    }
                    None => {
                        // A final event may lack the trailing blank line.
                        let rest = std::mem::take(&mut buffer);
                        return parse_event(&rest)
                            .map(|event| (event, (stream, buffer, after_cr, true)));
                    }
                }
            }
        },
    )
}

/// Append `bytes` with `\r\n` and lone `\r` rewritten to `\n`.
///
/// `after_cr` says whether the previous read ended in `\r`; the return value
/// is the same flag for this read.
fn push_normalized(buffer: &mut Vec<u8>, bytes: &[u8], mut after_cr: bool) -> bool {
    for &b in bytes {
        match b {
            b'\r' => {
                buffer.push(b'\n');
                after_cr = true;
            }
            b'\n' if after_cr => after_cr = false,
            _ => {
                buffer.push(b);
                after_cr = false;
            }
        }
    }
    after_cr
}

/// Split the first complete event off the front of `buffer`.
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let mut event: Vec<u8> = buffer.drain(..end + 2).collect();
    event.truncate(end);
    Some(event)
}

/// Parse one event's bytes; `None` when the event carries no data.
fn parse_event(event: &[u8]) -> Option<Result<GenerateContentResponse>> {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => return Some(Err(e.into())),
    };

    let mut data = String::new();
    let mut has_data = false;
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            if has_data {
                data.push('\n');
            }
            data.push_str(value.strip_prefix(' ').unwrap_or(value));
            has_data = true;
        }
    }
    if !has_data || data.trim().is_empty() || data.trim() == "[DONE]" {
        return None;
    }

    STREAM_EVENTS.click();
    Some(
        serde_json::from_str::<GenerateContentResponse>(&data).map_err(|e| {
            Error::serialization(format!("Failed to parse event JSON: {e}"), Some(Box::new(e)))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    const CHUNK_HI: &str = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi"}]}}]}"#;

    fn bytes_stream(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
    }

    #[tokio::test]
    async fn parse_single_event() {
        let data = format!("data: {CHUNK_HI}\n\n").into_bytes();
        let mut events = Box::pin(decode_events(bytes_stream(vec![data])));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("Hi"));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn crlf_and_split_chunks() {
        let data = format!("data: {CHUNK_HI}\r\n\r\n").into_bytes();
        let (a, b) = data.split_at(17);
        let mut events = Box::pin(decode_events(bytes_stream(vec![a.to_vec(), b.to_vec()])));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("Hi"));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn bare_cr_line_endings() {
        let data = format!(": ping\r\rdata: {CHUNK_HI}\r\rdata: {CHUNK_HI}\r\r").into_bytes();
        let mut events = Box::pin(decode_events(bytes_stream(vec![data])));
        for _ in 0..2 {
            let event = events.next().await.unwrap().unwrap();
            assert_eq!(event.text().as_deref(), Some("Hi"));
        }
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn crlf_split_between_reads() {
        let data = format!("data: {CHUNK_HI}\r\n\r\n").into_bytes();
        // The first read ends on the `\r`, the second starts with `\n`.
        let split = data.len() - 3;
        let (a, b) = data.split_at(split);
        let mut events = Box::pin(decode_events(bytes_stream(vec![a.to_vec(), b.to_vec()])));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("Hi"));
        assert!(events.next().await.is_none());
    }

    #[test]
    fn normalizes_line_endings() {
        let mut buffer = Vec::new();
        let after_cr = push_normalized(&mut buffer, b"a\r\nb\rc\r", false);
        assert!(after_cr);
        assert!(!push_normalized(&mut buffer, b"\nd", after_cr));
        assert_eq!(buffer, b"a\nb\nc\nd");
    }

    #[tokio::test]
    async fn multibyte_character_split_across_reads() {
        let data = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"caf\u{e9}\"}]}}]}\n\n";
        let bytes = data.as_bytes();
        // Split inside the two-byte encoding of the accented character.
        let split = data.find('\u{e9}').unwrap() + 1;
        let mut events = Box::pin(decode_events(bytes_stream(vec![
            bytes[..split].to_vec(),
            bytes[split..].to_vec(),
        ])));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("caf\u{e9}"));
    }

    #[tokio::test]
    async fn skips_comments_and_handles_missing_trailer() {
        let data = format!(": keep-alive\n\ndata: {CHUNK_HI}").into_bytes();
        let mut events = Box::pin(decode_events(bytes_stream(vec![data])));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("Hi"));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let mut events = Box::pin(decode_events(bytes_stream(vec![b"data: {nope\n\n".to_vec()])));
        let event = events.next().await.unwrap();
        assert!(matches!(event, Err(Error::Serialization { .. })));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let chunks: Vec<Result<Bytes>> = vec![
            Err(Error::streaming("reset by peer", None)),
            Ok(Bytes::from_static(b"data: {}\n\n")),
        ];
        let mut events = Box::pin(decode_events(stream::iter(chunks)));
        assert!(events.next().await.unwrap().is_err());
        assert!(events.next().await.is_none());
    }
}
