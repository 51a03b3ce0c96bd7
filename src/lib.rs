//! # GraphQL Fanout Bridge
//!
//! Serve GraphQL subscriptions from stateless HTTP servers by delegating
//! WebSocket connection holding to a GRIP proxy (such as Pushpin).
//!
//! ## How it works
//!
//! - The proxy holds every client WebSocket and converts activity on it
//!   into WebSocket-Over-HTTP POSTs against the bridge.
//! - The bridge answers the graphql-ws handshake itself and records each
//!   `start` as a durable subscription, asking the proxy to subscribe the
//!   held socket to a channel derived from the query.
//! - When the application publishes an event, the fan-out engine looks up
//!   matching subscriptions and posts one message per operation to the
//!   proxy's EPCP control endpoint, which delivers it to every subscribed
//!   socket.
//!
//! No subscription state ever lives in process memory between requests, so
//! any number of bridge instances can sit behind the proxy.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graphql_fanout::prelude::*;
//!
//! let registry = SubscriptionRegistry::in_memory();
//! let schema = SubscriptionSchema::new(vec![
//!     SubscriptionField::new("itemAdded", "itemAdded", "Item"),
//!     SubscriptionField::new("itemAddedToCategory", "itemAdded", "Item")
//!         .filtered_by("category"),
//! ]);
//!
//! let config = BridgeConfig::default();
//!
//! // Publish path: fan out application events via the proxy's control URL
//! let engine = FanoutEngine::new(schema, registry.clone());
//! let publisher = EpcpPublisher::from_config(&config);
//!
//! // Request path: serve WebSocket-Over-HTTP from the proxy
//! tokio::spawn(server::serve(config, registry));
//! engine
//!     .publish(&publisher, "itemAdded", &serde_json::json!({
//!         "itemAdded": {"id": "1", "category": "news"}
//!     }))
//!     .await?;
//! ```

pub mod channel;
pub mod config;
pub mod core;
pub mod graphql;
pub mod janitor;
pub mod pubsub;
pub mod registry;
pub mod server;
pub mod storage;
pub mod wire;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Errors ===
    pub use crate::core::error::{BridgeError, BridgeResult, ErrorResponse};

    // === Wire layer ===
    pub use crate::wire::context::{
        ConnectionContext, ConnectionHandler, OpenResponse, ReplayOutput, replay_events,
    };
    pub use crate::wire::event::{WireEvent, decode_events, encode_events};

    // === GraphQL layer ===
    pub use crate::graphql::handshake::GraphqlWsBridgeHandler;
    pub use crate::graphql::message::{GraphqlWsMessage, StartPayload};
    pub use crate::graphql::query::{ArgumentValue, SubscriptionOperation, parse_subscription};

    // === Channels and fan-out ===
    pub use crate::channel::{ChannelKind, ChannelName};
    pub use crate::pubsub::{
        ChannelPublish, ChannelPublisher, EpcpPublisher, FanoutEngine, FieldFilter,
        RecordingPublisher, SubscriptionField, SubscriptionSchema,
    };

    // === Registry and storage ===
    pub use crate::janitor::StorageJanitor;
    pub use crate::registry::{
        ExpirableRecord, StoredConnection, StoredSubscription, SubscriptionRegistry,
    };
    pub use crate::storage::{InMemoryTable, SimpleTable, TableRecord};

    // === Config ===
    pub use crate::config::BridgeConfig;

    // === Server ===
    pub use crate::server::{self, BridgeState, build_bridge_routes};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
