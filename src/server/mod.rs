//! HTTP surface of the bridge
//!
//! One POST route receives WebSocket-Over-HTTP event streams from the GRIP
//! proxy. Everything else the bridge does (fan-out publishing, cleanup)
//! happens outside the request path.

pub mod handler;
pub mod router;

pub use handler::{BridgeState, WEBSOCKET_EVENTS_CONTENT_TYPE};
pub use router::build_bridge_routes;

use crate::config::BridgeConfig;
use crate::janitor::StorageJanitor;
use crate::registry::SubscriptionRegistry;
use anyhow::Result;
use tokio::net::TcpListener;

/// Bind and serve the bridge, with the janitor sweeping in the background
pub async fn serve(config: BridgeConfig, registry: SubscriptionRegistry) -> Result<()> {
    let janitor = StorageJanitor::new(registry.clone(), config.record_lifetime_seconds);
    tokio::spawn(janitor.run(config.janitor_interval_seconds));

    let app = build_bridge_routes(BridgeState::new(&config, registry));
    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "Bridge listening");
    axum::serve(listener, app).await?;
    Ok(())
}
