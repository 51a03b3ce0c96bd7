//! GraphQL-WS handshake emulation over WebSocket-Over-HTTP
//!
//! There is no live subscription server behind the proxy, so the bridge
//! answers the client-driven handshake itself: `connection_init` is
//! acknowledged unconditionally (any auth token in the payload is opaque
//! pass-through), `start` records the subscription and asks the proxy to
//! subscribe the held socket to the derived channel, and `stop` deletes the
//! record and confirms with `complete`. Subscription data never flows
//! through here — it arrives later via the publish fan-out engine.

use crate::channel::{ChannelKind, ChannelName};
use crate::core::error::{BridgeError, BridgeResult};
use crate::graphql::message::GraphqlWsMessage;
use crate::graphql::query::parse_subscription;
use crate::registry::SubscriptionRegistry;
use crate::wire::context::{ConnectionContext, ConnectionHandler, OpenResponse};
use async_trait::async_trait;

/// Connection handler implementing the graphql-ws handshake for one request
///
/// Holds no per-connection state of its own; everything it needs is
/// reconstructed from the [`SubscriptionRegistry`] and the per-request
/// [`ConnectionContext`].
pub struct GraphqlWsBridgeHandler {
    registry: SubscriptionRegistry,
    subprotocol: String,
}

impl GraphqlWsBridgeHandler {
    /// Create a handler advertising the given sub-protocol (normally
    /// `graphql-ws`)
    pub fn new(registry: SubscriptionRegistry, subprotocol: impl Into<String>) -> Self {
        Self {
            registry,
            subprotocol: subprotocol.into(),
        }
    }

    async fn handle_start(
        &self,
        ctx: &mut ConnectionContext,
        operation_id: &str,
        query: &str,
        variables: Option<&serde_json::Map<String, serde_json::Value>>,
        raw_message: &str,
    ) -> BridgeResult<()> {
        let operation = parse_subscription(query, variables)?;
        let channel = ChannelName::resolve(
            &operation.field_name,
            &operation.arguments,
            ChannelKind::Broadcast,
        );

        // Storage first: a failed insert must not leave the proxy
        // subscribed to a channel nobody will ever be published to
        self.registry
            .record_connection(ctx.connection_id(), ctx.subprotocol())
            .await?;
        self.registry
            .insert_subscription(
                ctx.connection_id(),
                operation_id,
                &operation.field_name,
                raw_message,
            )
            .await?;

        tracing::debug!(
            connection_id = %ctx.connection_id(),
            operation_id = %operation_id,
            channel = %channel,
            "Subscribing held socket to channel"
        );
        ctx.subscribe(&channel);

        Ok(())
    }
}

#[async_trait]
impl ConnectionHandler for GraphqlWsBridgeHandler {
    async fn on_open(&self, ctx: &mut ConnectionContext) -> BridgeResult<Option<OpenResponse>> {
        self.registry
            .record_connection(ctx.connection_id(), ctx.subprotocol())
            .await?;

        Ok(Some(OpenResponse {
            headers: vec![(
                "sec-websocket-protocol".to_string(),
                self.subprotocol.clone(),
            )],
        }))
    }

    async fn on_message(
        &self,
        ctx: &mut ConnectionContext,
        message: &str,
    ) -> BridgeResult<Option<String>> {
        match GraphqlWsMessage::parse(message)? {
            GraphqlWsMessage::ConnectionInit { .. } => {
                Ok(Some(GraphqlWsMessage::ConnectionAck.to_json()))
            }
            GraphqlWsMessage::Start { id, payload } => {
                self.handle_start(
                    ctx,
                    &id,
                    &payload.query,
                    payload.variables.as_ref(),
                    message,
                )
                .await?;
                // No immediate reply; data arrives later via fan-out
                Ok(None)
            }
            GraphqlWsMessage::Stop { id } => {
                self.registry
                    .remove_subscription(ctx.connection_id(), &id)
                    .await?;
                Ok(Some(GraphqlWsMessage::complete(&id).to_json()))
            }
            // Server-to-client message types can never arrive from a client
            GraphqlWsMessage::ConnectionAck => Err(unexpected("connection_ack")),
            GraphqlWsMessage::Data { .. } => Err(unexpected("data")),
            GraphqlWsMessage::Complete { .. } => Err(unexpected("complete")),
        }
    }

    async fn on_close(&self, ctx: &mut ConnectionContext, _code: Option<u16>) -> BridgeResult<()> {
        self.registry.remove_connection(ctx.connection_id()).await
    }

    async fn on_disconnect(&self, ctx: &mut ConnectionContext) -> BridgeResult<()> {
        self.registry.remove_connection(ctx.connection_id()).await
    }
}

fn unexpected(message_type: &str) -> BridgeError {
    BridgeError::UnexpectedMessageType {
        message_type: message_type.to_string(),
    }
}
