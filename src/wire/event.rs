//! Event codec for the WebSocket-Over-HTTP transport
//!
//! The GRIP proxy delivers WebSocket frames to the backend as an HTTP request
//! body in the `application/websocket-events` format: one event per frame,
//! each encoded as
//!
//! ```text
//! NAME[ <hex content size>]\r\n
//! [<content>\r\n]
//! ```
//!
//! For example `OPEN\r\n` or `TEXT 5\r\nhello\r\n`. The response body uses
//! the same encoding. `CLOSE` content, when present, is a 2-byte big-endian
//! close code.
//!
//! The wire format is a fixed external contract of the proxy; this module
//! only translates it to and from [`WireEvent`] values. Round-trip law:
//! `decode(&encode(&events)) == events` for any representable sequence.

use crate::core::error::{BridgeError, BridgeResult};

/// One WebSocket frame event carried over HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// Connection opened
    Open,
    /// Text frame
    Text(String),
    /// Binary frame, passed through uninterpreted
    Binary(Vec<u8>),
    /// Close frame with an optional 16-bit close code
    Close(Option<u16>),
    /// Ping frame
    Ping,
    /// Pong frame
    Pong,
    /// Connection closed uncleanly or does not exist
    Disconnect,
}

impl WireEvent {
    /// The event name as it appears on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            WireEvent::Open => "OPEN",
            WireEvent::Text(_) => "TEXT",
            WireEvent::Binary(_) => "BINARY",
            WireEvent::Close(_) => "CLOSE",
            WireEvent::Ping => "PING",
            WireEvent::Pong => "PONG",
            WireEvent::Disconnect => "DISCONNECT",
        }
    }

    fn content(&self) -> Option<Vec<u8>> {
        match self {
            WireEvent::Text(text) => Some(text.as_bytes().to_vec()),
            WireEvent::Binary(bytes) => Some(bytes.clone()),
            WireEvent::Close(Some(code)) => Some(code.to_be_bytes().to_vec()),
            _ => None,
        }
    }
}

/// Encode a sequence of events into an `application/websocket-events` body
pub fn encode_events(events: &[WireEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        out.extend_from_slice(event.type_name().as_bytes());
        if let Some(content) = event.content() {
            out.extend_from_slice(format!(" {:x}\r\n", content.len()).as_bytes());
            out.extend_from_slice(&content);
            out.extend_from_slice(b"\r\n");
        } else {
            out.extend_from_slice(b"\r\n");
        }
    }
    out
}

/// Decode an `application/websocket-events` body into an ordered event
/// sequence
///
/// Fails with [`BridgeError::MalformedEventStream`] when the bytes cannot be
/// split into well-formed frames. A valid empty body decodes to an empty
/// vector; callers must treat zero events as a bad-request condition.
pub fn decode_events(body: &[u8]) -> BridgeResult<Vec<WireEvent>> {
    let mut events = Vec::new();
    let mut pos = 0;

    while pos < body.len() {
        let line_end = find_crlf(body, pos).ok_or_else(|| malformed("missing CRLF after event header"))?;
        let header = std::str::from_utf8(&body[pos..line_end])
            .map_err(|_| malformed("event header is not valid UTF-8"))?;
        pos = line_end + 2;

        let (name, size) = match header.split_once(' ') {
            Some((name, size_hex)) => {
                let size = usize::from_str_radix(size_hex.trim(), 16)
                    .map_err(|_| malformed(&format!("invalid content size '{}'", size_hex)))?;
                (name, Some(size))
            }
            None => (header, None),
        };

        let content = match size {
            Some(size) => {
                if pos + size > body.len() {
                    return Err(malformed("content truncated"));
                }
                let content = body[pos..pos + size].to_vec();
                pos += size;
                if body.get(pos..pos + 2) != Some(b"\r\n") {
                    return Err(malformed("missing CRLF after event content"));
                }
                pos += 2;
                Some(content)
            }
            None => None,
        };

        events.push(event_from_parts(name, content)?);
    }

    Ok(events)
}

fn event_from_parts(name: &str, content: Option<Vec<u8>>) -> BridgeResult<WireEvent> {
    let event = match name {
        "OPEN" => WireEvent::Open,
        "TEXT" => {
            let bytes = content.unwrap_or_default();
            let text = String::from_utf8(bytes)
                .map_err(|_| malformed("TEXT content is not valid UTF-8"))?;
            WireEvent::Text(text)
        }
        "BINARY" => WireEvent::Binary(content.unwrap_or_default()),
        "CLOSE" => match content {
            Some(bytes) if bytes.len() == 2 => {
                WireEvent::Close(Some(u16::from_be_bytes([bytes[0], bytes[1]])))
            }
            Some(_) => return Err(malformed("CLOSE content must be a 2-byte close code")),
            None => WireEvent::Close(None),
        },
        "PING" => WireEvent::Ping,
        "PONG" => WireEvent::Pong,
        "DISCONNECT" => WireEvent::Disconnect,
        other => return Err(malformed(&format!("unknown event type '{}'", other))),
    };
    Ok(event)
}

fn find_crlf(body: &[u8], from: usize) -> Option<usize> {
    body[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

fn malformed(message: &str) -> BridgeError {
    BridgeError::MalformedEventStream {
        message: message.to_string(),
    }
}
