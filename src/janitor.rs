//! Expired-record cleanup
//!
//! CLOSE and DISCONNECT events are best-effort; a proxy crash or dropped
//! request can leave registry records behind forever. The janitor sweeps
//! both tables and deletes anything whose last-seen timestamp is older than
//! the configured lifetime. Every sweep is idempotent, so overlapping runs
//! from several bridge instances are safe.

use crate::core::error::BridgeResult;
use crate::registry::{ExpirableRecord, SubscriptionRegistry};
use crate::storage::SimpleTable;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Sweeps expired subscription and connection records
#[derive(Clone)]
pub struct StorageJanitor {
    registry: SubscriptionRegistry,
    lifetime: Duration,
}

impl StorageJanitor {
    /// Create a janitor expiring records not seen for `lifetime_seconds`
    pub fn new(registry: SubscriptionRegistry, lifetime_seconds: u64) -> Self {
        Self {
            registry,
            lifetime: Duration::seconds(lifetime_seconds as i64),
        }
    }

    /// Run one sweep over both tables, returning how many records were
    /// deleted
    pub async fn clean(&self) -> BridgeResult<usize> {
        let cutoff = Utc::now() - self.lifetime;

        let mut deleted = sweep(&self.registry.subscription_table(), cutoff).await?;
        deleted += sweep(&self.registry.connection_table(), cutoff).await?;

        if deleted > 0 {
            tracing::info!(deleted = deleted, "Janitor removed expired records");
        }
        Ok(deleted)
    }

    /// Sweep forever on a fixed interval
    ///
    /// Intended to be spawned as a background task next to the server. A
    /// failed sweep is logged and retried on the next tick.
    pub async fn run(self, interval_seconds: u64) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
        loop {
            interval.tick().await;
            if let Err(error) = self.clean().await {
                tracing::error!(error = %error, "Janitor sweep failed");
            }
        }
    }
}

async fn sweep<R: ExpirableRecord>(
    table: &Arc<dyn SimpleTable<R>>,
    cutoff: DateTime<Utc>,
) -> BridgeResult<usize> {
    let mut deleted = 0;
    for record in table.scan().await? {
        if record.last_seen() < cutoff {
            table.delete(record.record_id()).await?;
            deleted += 1;
        }
    }
    Ok(deleted)
}
