//! Publish fan-out engine
//!
//! Turns one internal publish event (trigger name + payload) into zero or
//! more independently publishable channel messages by consulting the
//! subscription schema and the registry. The engine runs on whichever
//! server instance happens to execute the mutation; the registry is the
//! only coupling to the instances that handled the `start` handshakes.

use crate::channel::{ChannelKind, ChannelName};
use crate::core::error::BridgeResult;
use crate::graphql::message::GraphqlWsMessage;
use crate::graphql::query::{ArgumentValue, parse_subscription};
use crate::pubsub::epcp::ChannelPublisher;
use crate::pubsub::schema::{SubscriptionField, SubscriptionSchema};
use crate::registry::{StoredSubscription, SubscriptionRegistry};
use futures::future::join_all;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::HashSet;

/// One independently publishable fan-out target
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPublish {
    /// Channel the proxy routes on
    pub channel: ChannelName,
    /// JSON-encoded graphql-ws `data` envelope
    pub message: String,
}

/// Computes and delivers fan-out targets for publish events
pub struct FanoutEngine {
    schema: SubscriptionSchema,
    registry: SubscriptionRegistry,
}

impl FanoutEngine {
    /// Create an engine over the given schema and registry
    pub fn new(schema: SubscriptionSchema, registry: SubscriptionRegistry) -> Self {
        Self { schema, registry }
    }

    /// Compute the full list of (channel, message) targets for a publish
    ///
    /// One message per unique (field, operation-id) pair — never one per
    /// stored row. An unknown trigger fans out to nothing.
    pub async fn fan_out(&self, trigger: &str, payload: &Value) -> BridgeResult<Vec<ChannelPublish>> {
        let body = match payload.get(trigger) {
            Some(Value::Object(map)) => map.clone(),
            _ => {
                tracing::warn!(
                    trigger = %trigger,
                    "Publish payload has no object body under its trigger key"
                );
                Map::new()
            }
        };

        let mut publishes = Vec::new();
        for field in self.schema.fields_for_trigger(trigger) {
            let records = self.registry.subscriptions_for_field(&field.name).await?;
            match &field.filter {
                None => {
                    let channel = ChannelName::resolve(
                        &field.name,
                        &IndexMap::new(),
                        ChannelKind::Broadcast,
                    );
                    for operation_id in distinct_operation_ids(&records) {
                        publishes.push(ChannelPublish {
                            channel: channel.clone(),
                            message: data_message(&operation_id, field, &body),
                        });
                    }
                }
                Some(filter) => {
                    let Some(expected) = body
                        .get(&filter.payload_key)
                        .and_then(|value| ArgumentValue::from_json(value).ok())
                    else {
                        // Nothing to match a filtered field against
                        continue;
                    };

                    let matching: Vec<&StoredSubscription> = records
                        .iter()
                        .filter(|record| {
                            bound_argument(record, &filter.argument).as_ref() == Some(&expected)
                        })
                        .collect();

                    let mut arguments = IndexMap::new();
                    arguments.insert(filter.argument.clone(), expected);
                    let channel =
                        ChannelName::resolve(&field.name, &arguments, ChannelKind::Broadcast);

                    let matching: Vec<StoredSubscription> =
                        matching.into_iter().cloned().collect();
                    for operation_id in distinct_operation_ids(&matching) {
                        publishes.push(ChannelPublish {
                            channel: channel.clone(),
                            message: data_message(&operation_id, field, &body),
                        });
                    }
                }
            }
        }

        Ok(publishes)
    }

    /// Fan out and deliver, returning the number of successful publishes
    ///
    /// Targets are awaited in parallel; a failure on one channel is logged
    /// with its context and never blocks or rolls back siblings.
    pub async fn publish(
        &self,
        publisher: &dyn ChannelPublisher,
        trigger: &str,
        payload: &Value,
    ) -> BridgeResult<usize> {
        let publishes = self.fan_out(trigger, payload).await?;
        Ok(publish_all(publisher, &publishes).await)
    }
}

/// Deliver each target independently, in parallel
///
/// Returns the success count; failures are logged per channel.
pub async fn publish_all(publisher: &dyn ChannelPublisher, publishes: &[ChannelPublish]) -> usize {
    let results = join_all(
        publishes
            .iter()
            .map(|publish| publisher.publish(&publish.channel, &publish.message)),
    )
    .await;

    let mut delivered = 0;
    for (publish, result) in publishes.iter().zip(results) {
        match result {
            Ok(()) => delivered += 1,
            Err(error) => {
                tracing::error!(
                    channel = %publish.channel,
                    error = %error,
                    "Fan-out publish failed"
                );
            }
        }
    }
    delivered
}

/// Operation ids in first-seen order, de-duplicated
fn distinct_operation_ids(records: &[StoredSubscription]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.operation_id.clone()))
        .map(|record| record.operation_id.clone())
        .collect()
}

/// The argument a stored subscription bound for `argument`, re-derived from
/// its serialized start message
fn bound_argument(record: &StoredSubscription, argument: &str) -> Option<ArgumentValue> {
    let GraphqlWsMessage::Start { payload, .. } =
        GraphqlWsMessage::parse(&record.start_message).ok()?
    else {
        return None;
    };
    match parse_subscription(&payload.query, payload.variables.as_ref()) {
        Ok(operation) => operation.arguments.get(argument).cloned(),
        Err(error) => {
            // A stored record that no longer parses must not poison the
            // rest of the fan-out
            tracing::warn!(
                subscription_id = %record.id,
                error = %error,
                "Skipping stored subscription with unparsable start message"
            );
            None
        }
    }
}

/// Build the graphql-ws `data` envelope for one operation
fn data_message(operation_id: &str, field: &SubscriptionField, body: &Map<String, Value>) -> String {
    let mut object = Map::new();
    object.insert(
        "__typename".to_string(),
        Value::String(field.type_name.clone()),
    );
    for (key, value) in body {
        object.insert(key.clone(), value.clone());
    }

    GraphqlWsMessage::data(
        operation_id,
        json!({ "data": { field.name.clone(): Value::Object(object) } }),
    )
    .to_json()
}
