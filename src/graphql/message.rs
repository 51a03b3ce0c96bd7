//! graphql-ws JSON messages carried inside TEXT frames
//!
//! The client/server handshake protocol of `subscriptions-transport-ws`:
//!
//! ```json
//! {"type": "connection_init"}
//! {"type": "connection_ack"}
//! {"type": "start", "id": "1", "payload": {"query": "...", "variables": {}}}
//! {"type": "stop", "id": "1"}
//! {"type": "data", "id": "1", "payload": {"data": {...}}}
//! {"type": "complete", "id": "1", "payload": null}
//! ```

use crate::core::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of a `start` message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartPayload {
    /// The subscription query text
    pub query: String,
    /// Variable bindings for the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Map<String, Value>>,
    /// Operation name, unused by the bridge but round-tripped
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

/// One graphql-ws protocol message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphqlWsMessage {
    /// Client handshake open
    ConnectionInit {
        /// Opaque connection params (e.g. an auth token); passed through,
        /// never inspected
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Server handshake accept
    ConnectionAck,
    /// Client starts a subscription operation
    Start { id: String, payload: StartPayload },
    /// Client stops a subscription operation
    Stop { id: String },
    /// Server delivers a subscription result
    Data { id: String, payload: Value },
    /// Server confirms an operation is finished
    Complete { id: String, payload: Option<Value> },
}

impl GraphqlWsMessage {
    /// Parse a TEXT frame into a protocol message
    ///
    /// Distinguishes three failure shapes: content that is not JSON, a
    /// missing or unknown `type` discriminator
    /// ([`BridgeError::UnexpectedMessageType`]), and a known type whose
    /// fields are malformed.
    pub fn parse(text: &str) -> BridgeResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| BridgeError::MalformedEventStream {
                message: format!("TEXT frame is not valid JSON: {}", e),
            })?;

        let message_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| BridgeError::UnexpectedMessageType {
                message_type: "<missing>".to_string(),
            })?
            .to_string();

        match message_type.as_str() {
            "connection_init" | "connection_ack" | "start" | "stop" | "data" | "complete" => {
                serde_json::from_value(value).map_err(|e| BridgeError::MalformedEventStream {
                    message: format!("malformed '{}' message: {}", message_type, e),
                })
            }
            _ => Err(BridgeError::UnexpectedMessageType { message_type }),
        }
    }

    /// Serialize to the JSON text carried in a TEXT frame
    pub fn to_json(&self) -> String {
        // These value types always serialize; an empty string would only
        // indicate a serde_json bug
        serde_json::to_string(self).unwrap_or_default()
    }

    /// A `complete` reply for the given operation, with the explicit
    /// `payload: null` clients of the protocol expect
    pub fn complete(operation_id: &str) -> Self {
        GraphqlWsMessage::Complete {
            id: operation_id.to_string(),
            payload: None,
        }
    }

    /// A `data` message delivering a GraphQL result envelope
    pub fn data(operation_id: &str, payload: Value) -> Self {
        GraphqlWsMessage::Data {
            id: operation_id.to_string(),
            payload,
        }
    }
}
