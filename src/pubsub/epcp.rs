//! EPCP control-channel publishing to the GRIP proxy
//!
//! The proxy exposes an HTTP publish endpoint; posting an item with a
//! `ws-message` format delivers the content as a TEXT frame to every held
//! socket subscribed to the item's channel. This is the only way the bridge
//! ever sends data to a client — it never holds a socket itself.

use crate::channel::ChannelName;
use crate::config::BridgeConfig;
use crate::core::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Outbound publish capability consumed by the fan-out engine
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Deliver `message` to every connection subscribed to `channel`
    async fn publish(&self, channel: &ChannelName, message: &str) -> BridgeResult<()>;
}

/// Publisher speaking EPCP to a GRIP control endpoint over HTTP
pub struct EpcpPublisher {
    client: reqwest::Client,
    control_url: String,
}

impl EpcpPublisher {
    /// Create a publisher for the given control URL, e.g.
    /// `http://localhost:5561`
    pub fn new(control_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            control_url: control_url.into(),
        }
    }

    /// Create a publisher aimed at the configured GRIP control URL
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.grip_control_url.clone())
    }

    /// The control URL publishes are posted to
    pub fn control_url(&self) -> &str {
        &self.control_url
    }
}

#[async_trait]
impl ChannelPublisher for EpcpPublisher {
    async fn publish(&self, channel: &ChannelName, message: &str) -> BridgeResult<()> {
        let body = json!({
            "items": [{
                "channel": channel.as_str(),
                "formats": {
                    "ws-message": { "content": message }
                }
            }]
        });

        let url = format!("{}/publish/", self.control_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| publish_failed(channel, &e.to_string()))?;

        if !response.status().is_success() {
            return Err(publish_failed(
                channel,
                &format!("control endpoint returned {}", response.status()),
            ));
        }

        tracing::debug!(channel = %channel, "EPCP publish delivered");
        Ok(())
    }
}

fn publish_failed(channel: &ChannelName, message: &str) -> BridgeError {
    BridgeError::PublishFailed {
        channel: channel.as_str().to_string(),
        message: message.to_string(),
    }
}

/// Publisher that records publishes in memory
///
/// Useful for testing and development, like the in-memory table.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingPublisher {
    /// Create an empty recording publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, as (channel, message) pairs
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChannelPublisher for RecordingPublisher {
    async fn publish(&self, channel: &ChannelName, message: &str) -> BridgeResult<()> {
        self.published
            .lock()
            .map_err(|e| BridgeError::PublishFailed {
                channel: channel.as_str().to_string(),
                message: e.to_string(),
            })?
            .push((channel.as_str().to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;
    use indexmap::IndexMap;

    #[test]
    fn test_from_config_uses_configured_control_url() {
        let config = BridgeConfig {
            grip_control_url: "http://pushpin:5561".to_string(),
            ..BridgeConfig::default()
        };
        let publisher = EpcpPublisher::from_config(&config);
        assert_eq!(publisher.control_url(), "http://pushpin:5561");
    }

    #[tokio::test]
    async fn test_recording_publisher_records_in_order() {
        let publisher = RecordingPublisher::new();
        let channel = ChannelName::resolve("itemAdded", &IndexMap::new(), ChannelKind::Broadcast);

        publisher.publish(&channel, "first").await.unwrap();
        publisher.publish(&channel, "second").await.unwrap();

        assert_eq!(
            publisher.published(),
            vec![
                ("itemAdded".to_string(), "first".to_string()),
                ("itemAdded".to_string(), "second".to_string()),
            ]
        );
    }
}
