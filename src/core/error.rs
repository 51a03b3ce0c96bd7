//! Typed error handling for the subscription bridge
//!
//! Every failure the bridge can produce maps onto one variant of
//! [`BridgeError`], so callers can handle errors specifically instead of
//! matching on strings or dealing with generic `anyhow::Error` values.
//!
//! # Error policy
//!
//! - Client/protocol faults (malformed event stream, missing connection id,
//!   protocol violations, bad subscription queries) map to HTTP 400.
//! - Storage and publish failures map to HTTP 500.
//! - There is no automatic retry in this crate: inserts and deletes are
//!   idempotent, so a layer above can safely retry a failed request.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type for the subscription bridge
#[derive(Debug)]
pub enum BridgeError {
    /// The WebSocket-Over-HTTP request body could not be split into
    /// well-formed events
    MalformedEventStream { message: String },

    /// The proxy did not send a `connection-id` header
    MissingConnectionId,

    /// An event arrived that cannot occur in a valid stream
    ProtocolViolation { message: String },

    /// A `start` message carried a query that is not a single root
    /// subscription field
    UnparsableSubscriptionQuery { message: String },

    /// A subscription argument used a list or object literal, which cannot
    /// be canonicalized into a channel name
    UnsupportedArgumentValueType { kind: String },

    /// A graphql-ws message had an unknown or out-of-place `type`
    UnexpectedMessageType { message_type: String },

    /// The storage backend failed or is unreachable
    StorageUnavailable { message: String },

    /// An EPCP publish to the GRIP proxy failed
    PublishFailed { channel: String, message: String },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::MalformedEventStream { message } => {
                write!(f, "Malformed websocket-events stream: {}", message)
            }
            BridgeError::MissingConnectionId => {
                write!(f, "Expected connection-id header but none is present")
            }
            BridgeError::ProtocolViolation { message } => {
                write!(f, "WebSocket-Over-HTTP protocol violation: {}", message)
            }
            BridgeError::UnparsableSubscriptionQuery { message } => {
                write!(f, "Could not parse subscription query: {}", message)
            }
            BridgeError::UnsupportedArgumentValueType { kind } => {
                write!(f, "Unsupported argument value type: {}", kind)
            }
            BridgeError::UnexpectedMessageType { message_type } => {
                write!(f, "Unexpected graphql-ws message type '{}'", message_type)
            }
            BridgeError::StorageUnavailable { message } => {
                write!(f, "Storage unavailable: {}", message)
            }
            BridgeError::PublishFailed { channel, message } => {
                write!(f, "Publish to channel '{}' failed: {}", channel, message)
            }
        }
    }
}

impl std::error::Error for BridgeError {}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl BridgeError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::MalformedEventStream { .. } => StatusCode::BAD_REQUEST,
            BridgeError::MissingConnectionId => StatusCode::BAD_REQUEST,
            BridgeError::ProtocolViolation { .. } => StatusCode::BAD_REQUEST,
            BridgeError::UnparsableSubscriptionQuery { .. } => StatusCode::BAD_REQUEST,
            BridgeError::UnsupportedArgumentValueType { .. } => StatusCode::BAD_REQUEST,
            BridgeError::UnexpectedMessageType { .. } => StatusCode::BAD_REQUEST,
            BridgeError::StorageUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::PublishFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::MalformedEventStream { .. } => "MALFORMED_EVENT_STREAM",
            BridgeError::MissingConnectionId => "MISSING_CONNECTION_ID",
            BridgeError::ProtocolViolation { .. } => "PROTOCOL_VIOLATION",
            BridgeError::UnparsableSubscriptionQuery { .. } => "UNPARSABLE_SUBSCRIPTION_QUERY",
            BridgeError::UnsupportedArgumentValueType { .. } => "UNSUPPORTED_ARGUMENT_VALUE_TYPE",
            BridgeError::UnexpectedMessageType { .. } => "UNEXPECTED_MESSAGE_TYPE",
            BridgeError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
            BridgeError::PublishFailed { .. } => "PUBLISH_FAILED",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

/// Storage trait implementations report errors through `anyhow`; the bridge
/// folds them into the typed hierarchy at its boundary.
impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::StorageUnavailable {
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
