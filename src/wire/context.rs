//! Per-request connection context and event replay
//!
//! A stateless server never holds a socket: every WebSocket-Over-HTTP request
//! reconstructs what the connection wants from storage, replays the decoded
//! events through a [`ConnectionHandler`], and throws the context away when
//! the HTTP response is written.
//!
//! The context accumulates two kinds of output while events are replayed:
//!
//! - ordinary reply frames (one TEXT per non-empty handler reply, mirrored
//!   OPEN/CLOSE/DISCONNECT acks, echoed BINARY/PING/PONG),
//! - GRIP control instructions ("subscribe this held socket to channel X"),
//!   encoded as `c:`-prefixed TEXT events so the proxy routes them to its
//!   control plane instead of the client.
//!
//! Control events are written to the response body before reply frames, the
//! order the proxy expects.

use crate::channel::ChannelName;
use crate::core::error::{BridgeError, BridgeResult};
use crate::wire::event::WireEvent;
use async_trait::async_trait;
use serde_json::json;

/// Prefix that marks a TEXT event as a GRIP control message
const CONTROL_PREFIX: &str = "c:";

/// Response headers produced by `on_open`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenResponse {
    /// Headers to set on the HTTP response, e.g. the negotiated
    /// `sec-websocket-protocol`
    pub headers: Vec<(String, String)>,
}

/// Per-request state for one logical proxy-held connection
///
/// Lives only for the duration of a single HTTP call.
#[derive(Debug)]
pub struct ConnectionContext {
    connection_id: String,
    subprotocol: Option<String>,
    control_events: Vec<WireEvent>,
    subscribed_channels: Vec<String>,
}

impl ConnectionContext {
    /// Create a context for the connection identified by the proxy
    pub fn new(connection_id: impl Into<String>, subprotocol: Option<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            subprotocol,
            control_events: Vec::new(),
            subscribed_channels: Vec::new(),
        }
    }

    /// Connection id assigned by the proxy
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// `Sec-WebSocket-Protocol` offered by the client, if any
    pub fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }

    /// Instruct the proxy to subscribe this held socket to a channel
    pub fn subscribe(&mut self, channel: &ChannelName) {
        let channel = channel.as_str().to_string();
        self.control_events.push(control_event("subscribe", &channel));
        self.subscribed_channels.push(channel);
    }

    /// Instruct the proxy to drop this held socket from a channel
    pub fn unsubscribe(&mut self, channel: &ChannelName) {
        self.control_events
            .push(control_event("unsubscribe", channel.as_str()));
    }

    /// Channels subscribed during this request (for logging/tests)
    pub fn subscribed_channels(&self) -> &[String] {
        &self.subscribed_channels
    }

    /// Drain the accumulated control events
    fn take_control_events(&mut self) -> Vec<WireEvent> {
        std::mem::take(&mut self.control_events)
    }
}

fn control_event(control_type: &str, channel: &str) -> WireEvent {
    let control = json!({ "type": control_type, "channel": channel });
    WireEvent::Text(format!("{}{}", CONTROL_PREFIX, control))
}

/// Handler capability invoked while replaying a decoded event stream
///
/// One typed interface instead of free-form callbacks: each method receives
/// the mutable context (to record channel subscriptions) and returns an
/// explicit result, so handlers are testable without any socket.
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    /// Connection opened; may contribute response headers
    async fn on_open(&self, ctx: &mut ConnectionContext) -> BridgeResult<Option<OpenResponse>>;

    /// Text frame received; may return a reply frame
    async fn on_message(
        &self,
        ctx: &mut ConnectionContext,
        message: &str,
    ) -> BridgeResult<Option<String>>;

    /// Connection closed explicitly with an optional close code
    async fn on_close(&self, ctx: &mut ConnectionContext, code: Option<u16>) -> BridgeResult<()>;

    /// Connection closed uncleanly or no longer exists
    async fn on_disconnect(&self, ctx: &mut ConnectionContext) -> BridgeResult<()>;
}

/// Everything a replayed request produces
#[derive(Debug, Default)]
pub struct ReplayOutput {
    /// Control events followed by reply frames, in response-body order
    pub events: Vec<WireEvent>,
    /// Response headers contributed by `on_open`
    pub headers: Vec<(String, String)>,
}

/// Replay decoded events through a handler, in order
///
/// OPEN invokes `on_open` and mirrors an OPEN ack; TEXT invokes `on_message`
/// and emits one TEXT per non-empty reply; CLOSE/DISCONNECT invoke their
/// handlers and are mirrored back; BINARY, PING and PONG are echoed without
/// interpretation. Any event after a terminal CLOSE or DISCONNECT is a
/// [`BridgeError::ProtocolViolation`]. Handler errors propagate without
/// partial writes (the caller discards the whole output on error).
pub async fn replay_events(
    ctx: &mut ConnectionContext,
    events: &[WireEvent],
    handler: &dyn ConnectionHandler,
) -> BridgeResult<ReplayOutput> {
    let mut replies: Vec<WireEvent> = Vec::new();
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut terminated = false;

    for event in events {
        if terminated {
            return Err(BridgeError::ProtocolViolation {
                message: format!(
                    "{} event after terminal CLOSE/DISCONNECT in the same stream",
                    event.type_name()
                ),
            });
        }
        match event {
            WireEvent::Open => {
                if let Some(response) = handler.on_open(ctx).await? {
                    headers.extend(response.headers);
                }
                replies.push(WireEvent::Open);
            }
            WireEvent::Text(message) => {
                if message.is_empty() {
                    continue;
                }
                if let Some(reply) = handler.on_message(ctx, message).await? {
                    if !reply.is_empty() {
                        replies.push(WireEvent::Text(reply));
                    }
                }
            }
            WireEvent::Close(code) => {
                handler.on_close(ctx, *code).await?;
                replies.push(WireEvent::Close(*code));
                terminated = true;
            }
            WireEvent::Disconnect => {
                handler.on_disconnect(ctx).await?;
                replies.push(WireEvent::Disconnect);
                terminated = true;
            }
            // Not interpreted by the bridge; echoed so the proxy keeps the
            // client's keepalive semantics intact
            passthrough @ (WireEvent::Binary(_) | WireEvent::Ping | WireEvent::Pong) => {
                replies.push(passthrough.clone());
            }
        }
    }

    let mut out_events = ctx.take_control_events();
    out_events.extend(replies);

    Ok(ReplayOutput {
        events: out_events,
        headers,
    })
}
