//! WebSocket-Over-HTTP request handler
//!
//! The proxy converts each batch of WebSocket activity on a held socket
//! into one plain HTTP POST against this handler. The handler decodes the
//! event stream, replays it through the graphql-ws bridge, and encodes the
//! resulting events back into the response body. No connection state lives
//! in the process between two requests.

use crate::config::BridgeConfig;
use crate::core::error::{BridgeError, BridgeResult};
use crate::graphql::handshake::GraphqlWsBridgeHandler;
use crate::registry::SubscriptionRegistry;
use crate::wire::context::{ConnectionContext, replay_events};
use crate::wire::event::{decode_events, encode_events};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Media type of WebSocket-Over-HTTP request and response bodies
pub const WEBSOCKET_EVENTS_CONTENT_TYPE: &str = "application/websocket-events";

/// Extension header telling the proxy the bridge speaks GRIP
const GRIP_EXTENSIONS: &str = r#"grip; message-prefix="""#;

/// Shared state for the bridge routes
#[derive(Clone)]
pub struct BridgeState {
    /// Registry backing the handshake handler
    pub registry: SubscriptionRegistry,
    /// Sub-protocol advertised on OPEN
    pub subprotocol: String,
}

impl BridgeState {
    /// Build state from configuration and a registry
    pub fn new(config: &BridgeConfig, registry: SubscriptionRegistry) -> Self {
        Self {
            registry,
            subprotocol: config.subprotocol.clone(),
        }
    }
}

/// Handle one WebSocket-Over-HTTP POST from the proxy
pub async fn handle_websocket_events(
    State(state): State<BridgeState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BridgeError> {
    require_events_content_type(&headers)?;

    let connection_id = headers
        .get("connection-id")
        .and_then(|value| value.to_str().ok())
        .ok_or(BridgeError::MissingConnectionId)?
        .to_string();
    let subprotocol = headers
        .get("sec-websocket-protocol")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let events = decode_events(&body)?;
    if events.is_empty() {
        return Err(BridgeError::MalformedEventStream {
            message: "request carried no events".to_string(),
        });
    }

    tracing::debug!(
        connection_id = %connection_id,
        events = events.len(),
        "Replaying WebSocket-Over-HTTP events"
    );

    // Any request for a connection proves the socket is still held, so the
    // janitor must not expire its records
    state
        .registry
        .touch_activity(&connection_id, subprotocol.as_deref())
        .await?;

    let mut ctx = ConnectionContext::new(&connection_id, subprotocol);
    let handler = GraphqlWsBridgeHandler::new(state.registry.clone(), state.subprotocol.clone());
    let output = replay_events(&mut ctx, &events, &handler).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static(WEBSOCKET_EVENTS_CONTENT_TYPE),
    );
    response_headers.insert(
        HeaderName::from_static("sec-websocket-extensions"),
        HeaderValue::from_static(GRIP_EXTENSIONS),
    );
    for (name, value) in &output.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response_headers.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %name, "Dropping unrepresentable response header");
            }
        }
    }

    let body = encode_events(&output.events);
    Ok((StatusCode::OK, response_headers, body).into_response())
}

fn require_events_content_type(headers: &HeaderMap) -> BridgeResult<()> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|media| media.eq_ignore_ascii_case(WEBSOCKET_EVENTS_CONTENT_TYPE))
    {
        Ok(())
    } else {
        Err(BridgeError::ProtocolViolation {
            message: format!(
                "expected content type {}, got {:?}",
                WEBSOCKET_EVENTS_CONTENT_TYPE, content_type
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router::build_bridge_routes;
    use crate::wire::event::WireEvent;
    use axum_test::TestServer;
    use serde_json::Value;

    fn server() -> (TestServer, SubscriptionRegistry) {
        let registry = SubscriptionRegistry::in_memory();
        let state = BridgeState {
            registry: registry.clone(),
            subprotocol: "graphql-ws".to_string(),
        };
        let server = TestServer::new(build_bridge_routes(state));
        (server, registry)
    }

    async fn post_events(
        server: &TestServer,
        connection_id: &str,
        events: &[WireEvent],
    ) -> axum_test::TestResponse {
        server
            .post("/")
            .content_type(WEBSOCKET_EVENTS_CONTENT_TYPE)
            .add_header("connection-id", connection_id)
            .bytes(encode_events(events).into())
            .await
    }

    #[tokio::test]
    async fn test_open_is_mirrored_with_grip_headers() {
        let (server, _registry) = server();

        let response = post_events(&server, "conn-1", &[WireEvent::Open]).await;

        response.assert_status_ok();
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            WEBSOCKET_EVENTS_CONTENT_TYPE
        );
        assert_eq!(
            response.headers().get("sec-websocket-extensions").unwrap(),
            GRIP_EXTENSIONS
        );
        assert_eq!(
            response.headers().get("sec-websocket-protocol").unwrap(),
            "graphql-ws"
        );

        let events = decode_events(response.as_bytes()).unwrap();
        assert_eq!(events, vec![WireEvent::Open]);
    }

    #[tokio::test]
    async fn test_missing_connection_id_is_rejected() {
        let (server, _registry) = server();

        let response = server
            .post("/")
            .content_type(WEBSOCKET_EVENTS_CONTENT_TYPE)
            .bytes(encode_events(&[WireEvent::Open]).into())
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "MISSING_CONNECTION_ID");
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_rejected() {
        let (server, _registry) = server();

        let response = server
            .post("/")
            .content_type("application/json")
            .add_header("connection-id", "conn-1")
            .bytes(encode_events(&[WireEvent::Open]).into())
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "PROTOCOL_VIOLATION");
    }

    #[tokio::test]
    async fn test_empty_event_stream_is_rejected() {
        let (server, _registry) = server();

        let response = post_events(&server, "conn-1", &[]).await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "MALFORMED_EVENT_STREAM");
    }

    #[tokio::test]
    async fn test_connection_init_round_trip() {
        let (server, _registry) = server();

        let response = post_events(
            &server,
            "conn-1",
            &[WireEvent::Text(r#"{"type":"connection_init"}"#.to_string())],
        )
        .await;

        response.assert_status_ok();
        let events = decode_events(response.as_bytes()).unwrap();
        assert_eq!(
            events,
            vec![WireEvent::Text(r#"{"type":"connection_ack"}"#.to_string())]
        );
    }

    #[tokio::test]
    async fn test_start_subscribes_channel_before_any_reply() {
        let (server, registry) = server();

        let start = serde_json::json!({
            "type": "start",
            "id": "1",
            "payload": {"query": "subscription { itemAdded { id } }"}
        })
        .to_string();
        let response = post_events(&server, "conn-1", &[WireEvent::Text(start)]).await;

        response.assert_status_ok();
        let events = decode_events(response.as_bytes()).unwrap();
        assert_eq!(
            events,
            vec![WireEvent::Text(
                r#"c:{"type":"subscribe","channel":"itemAdded"}"#.to_string()
            )]
        );

        let records = registry.subscriptions_for_connection("conn-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation_id, "1");
    }

    #[tokio::test]
    async fn test_close_cleans_registry_and_mirrors_close() {
        let (server, registry) = server();

        let start = serde_json::json!({
            "type": "start",
            "id": "1",
            "payload": {"query": "subscription { itemAdded { id } }"}
        })
        .to_string();
        post_events(&server, "conn-1", &[WireEvent::Open, WireEvent::Text(start)]).await;

        let response = post_events(&server, "conn-1", &[WireEvent::Close(Some(1000))]).await;

        response.assert_status_ok();
        let events = decode_events(response.as_bytes()).unwrap();
        assert_eq!(events, vec![WireEvent::Close(Some(1000))]);
        assert!(
            registry
                .subscriptions_for_connection("conn-1")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (server, _registry) = server();
        let response = server.get("/health").await;
        response.assert_status_ok();
    }
}
