//! Publish fan-out: schema descriptors, EPCP delivery, fan-out engine

pub mod epcp;
pub mod fanout;
pub mod schema;

pub use epcp::{ChannelPublisher, EpcpPublisher, RecordingPublisher};
pub use fanout::{ChannelPublish, FanoutEngine, publish_all};
pub use schema::{FieldFilter, SubscriptionField, SubscriptionSchema};
