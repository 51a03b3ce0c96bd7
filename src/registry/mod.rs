//! Durable subscription and connection records
//!
//! The registry is the only owner of [`StoredSubscription`] records. It is
//! consulted twice per subscription lifetime from opposite directions:
//!
//! - on every WebSocket-Over-HTTP request, to recreate what the connection
//!   is subscribed to (there is no in-process connection object),
//! - at publish time, to compute which operations a trigger fans out to.
//!
//! Connection records exist only so the janitor can notice connections that
//! vanished without a CLOSE or DISCONNECT ever reaching the bridge.

use crate::core::error::BridgeResult;
use crate::storage::{SimpleTable, TableRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One active GraphQL subscription operation
///
/// Invariant: exactly one live record per (connection, operation) pair.
/// `start_message` keeps the original query text and variables so the
/// channel and argument values can be re-derived at publish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSubscription {
    /// Internally generated unique id (table key)
    pub id: String,
    /// Connection id assigned by the proxy
    pub connection_id: String,
    /// Client-supplied graphql-ws operation id, echoed in every data message
    pub operation_id: String,
    /// Root subscription field name, e.g. `itemAdded`
    pub field_name: String,
    /// The serialized graphql-ws `start` message that created this record
    pub start_message: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// Refreshed on activity; the janitor expires on this
    pub last_seen: DateTime<Utc>,
}

impl TableRecord for StoredSubscription {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Cleanup-only record of one proxy-held connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConnection {
    /// Connection id assigned by the proxy (table key)
    pub id: String,
    /// Negotiated sub-protocol, if any
    pub subprotocol: Option<String>,
    /// When the connection first opened
    pub created_at: DateTime<Utc>,
    /// Refreshed on every request for the connection
    pub last_seen: DateTime<Utc>,
}

impl TableRecord for StoredConnection {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// A record the janitor may expire by its last-seen timestamp
pub trait ExpirableRecord: TableRecord {
    /// Last activity observed for this record
    fn last_seen(&self) -> DateTime<Utc>;
}

impl ExpirableRecord for StoredSubscription {
    fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }
}

impl ExpirableRecord for StoredConnection {
    fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }
}

/// Exclusive owner of subscription and connection records
#[derive(Clone)]
pub struct SubscriptionRegistry {
    subscriptions: Arc<dyn SimpleTable<StoredSubscription>>,
    connections: Arc<dyn SimpleTable<StoredConnection>>,
}

impl SubscriptionRegistry {
    /// Create a registry over the given tables
    pub fn new(
        subscriptions: Arc<dyn SimpleTable<StoredSubscription>>,
        connections: Arc<dyn SimpleTable<StoredConnection>>,
    ) -> Self {
        Self {
            subscriptions,
            connections,
        }
    }

    /// Registry backed by in-memory tables (testing and development)
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(crate::storage::InMemoryTable::new()),
            Arc::new(crate::storage::InMemoryTable::new()),
        )
    }

    /// The subscription table (shared with the janitor)
    pub fn subscription_table(&self) -> Arc<dyn SimpleTable<StoredSubscription>> {
        self.subscriptions.clone()
    }

    /// The connection table (shared with the janitor)
    pub fn connection_table(&self) -> Arc<dyn SimpleTable<StoredConnection>> {
        self.connections.clone()
    }

    /// Record (or refresh) a connection seen on the wire
    pub async fn record_connection(
        &self,
        connection_id: &str,
        subprotocol: Option<&str>,
    ) -> BridgeResult<()> {
        let now = Utc::now();
        let existing = self.connections.get(connection_id).await?;
        let record = StoredConnection {
            id: connection_id.to_string(),
            subprotocol: subprotocol
                .map(str::to_string)
                .or_else(|| existing.as_ref().and_then(|c| c.subprotocol.clone())),
            created_at: existing.map(|c| c.created_at).unwrap_or(now),
            last_seen: now,
        };
        self.connections.insert(record).await?;
        Ok(())
    }

    /// Insert a subscription record for (connection, operation)
    ///
    /// Enforces the one-live-record invariant: any previous record for the
    /// same pair is deleted first, so concurrent writers degrade to
    /// last-write-wins on the pair.
    pub async fn insert_subscription(
        &self,
        connection_id: &str,
        operation_id: &str,
        field_name: &str,
        start_message: &str,
    ) -> BridgeResult<StoredSubscription> {
        for stale in self.records_for_pair(connection_id, operation_id).await? {
            self.subscriptions.delete(&stale.id).await?;
        }

        let now = Utc::now();
        let record = StoredSubscription {
            id: Uuid::new_v4().to_string(),
            connection_id: connection_id.to_string(),
            operation_id: operation_id.to_string(),
            field_name: field_name.to_string(),
            start_message: start_message.to_string(),
            created_at: now,
            last_seen: now,
        };
        self.subscriptions.insert(record.clone()).await?;

        tracing::debug!(
            connection_id = %connection_id,
            operation_id = %operation_id,
            field = %field_name,
            "Subscription recorded"
        );

        Ok(record)
    }

    /// Refresh last-seen on a connection and all of its subscriptions
    ///
    /// Called on every request for the connection, so the janitor never
    /// expires records that are still backed by a held socket.
    pub async fn touch_activity(
        &self,
        connection_id: &str,
        subprotocol: Option<&str>,
    ) -> BridgeResult<()> {
        self.record_connection(connection_id, subprotocol).await?;

        let now = Utc::now();
        for mut record in self.subscriptions_for_connection(connection_id).await? {
            record.last_seen = now;
            self.subscriptions.insert(record).await?;
        }
        Ok(())
    }

    /// Delete the record for (connection, operation); `true` if one existed
    pub async fn remove_subscription(
        &self,
        connection_id: &str,
        operation_id: &str,
    ) -> BridgeResult<bool> {
        let matches = self.records_for_pair(connection_id, operation_id).await?;
        let removed = !matches.is_empty();
        for record in matches {
            self.subscriptions.delete(&record.id).await?;
        }
        Ok(removed)
    }

    /// Delete every record belonging to a connection, plus the connection
    /// record itself
    pub async fn remove_connection(&self, connection_id: &str) -> BridgeResult<()> {
        for record in self.subscriptions_for_connection(connection_id).await? {
            self.subscriptions.delete(&record.id).await?;
        }
        self.connections.delete(connection_id).await?;

        tracing::debug!(connection_id = %connection_id, "Connection records removed");
        Ok(())
    }

    /// All records whose subscription field matches `field_name`
    pub async fn subscriptions_for_field(
        &self,
        field_name: &str,
    ) -> BridgeResult<Vec<StoredSubscription>> {
        Ok(self
            .subscriptions
            .scan()
            .await?
            .into_iter()
            .filter(|record| record.field_name == field_name)
            .collect())
    }

    /// All records belonging to a connection
    pub async fn subscriptions_for_connection(
        &self,
        connection_id: &str,
    ) -> BridgeResult<Vec<StoredSubscription>> {
        Ok(self
            .subscriptions
            .scan()
            .await?
            .into_iter()
            .filter(|record| record.connection_id == connection_id)
            .collect())
    }

    async fn records_for_pair(
        &self,
        connection_id: &str,
        operation_id: &str,
    ) -> BridgeResult<Vec<StoredSubscription>> {
        Ok(self
            .subscriptions
            .scan()
            .await?
            .into_iter()
            .filter(|record| {
                record.connection_id == connection_id && record.operation_id == operation_id
            })
            .collect())
    }
}
