//! Storage contract for cross-request bridge state
//!
//! Stateless handlers share no process memory, so every record the bridge
//! needs between requests lives behind [`SimpleTable`]. The contract is the
//! minimal key-value table surface the bridge consumes: get by id, upserting
//! insert, scan (plain or batched) and idempotent delete. Implementations
//! may be in-memory or a managed table service; the bridge is agnostic and
//! must never assume single-process memory.

pub mod in_memory;

pub use in_memory::InMemoryTable;

use anyhow::Result;
use async_trait::async_trait;

/// A record addressable by a string id
pub trait TableRecord: Clone + Send + Sync + 'static {
    /// Primary key of the record
    fn record_id(&self) -> &str;
}

/// Minimal table contract consumed by the bridge
///
/// `insert` upserts; `delete` of a missing id is a no-op. Both properties
/// make request handling and the janitor safe to run concurrently without
/// locks.
#[async_trait]
pub trait SimpleTable<R: TableRecord>: Send + Sync {
    /// Get a record by id, `None` when absent
    async fn get(&self, id: &str) -> Result<Option<R>>;

    /// Insert or replace a record
    async fn insert(&self, record: R) -> Result<()>;

    /// All records in the table
    async fn scan(&self) -> Result<Vec<R>>;

    /// Visit records in batches; the callback returns `false` to stop early
    async fn scan_batched(
        &self,
        callback: &mut (dyn for<'a> FnMut(&'a [R]) -> bool + Send),
    ) -> Result<()>;

    /// Delete a record by id; deleting an absent record is a no-op
    async fn delete(&self, id: &str) -> Result<()>;
}
