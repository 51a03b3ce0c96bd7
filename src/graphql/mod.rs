//! graphql-ws protocol layer: messages, query tools, handshake emulation

pub mod handshake;
pub mod message;
pub mod query;

pub use handshake::GraphqlWsBridgeHandler;
pub use message::{GraphqlWsMessage, StartPayload};
pub use query::{ArgumentValue, SubscriptionOperation, parse_subscription};
