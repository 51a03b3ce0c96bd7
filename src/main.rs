//! Standalone bridge server
//!
//! Runs the WebSocket-Over-HTTP surface with in-memory tables. Pass a YAML
//! config path as the first argument, or rely on defaults.

use anyhow::Result;
use graphql_fanout::config::BridgeConfig;
use graphql_fanout::registry::SubscriptionRegistry;
use graphql_fanout::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::from_yaml_file(&path)?,
        None => BridgeConfig::default(),
    };

    server::serve(config, SubscriptionRegistry::in_memory()).await
}
