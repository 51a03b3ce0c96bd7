//! In-memory implementation of the table contract for testing and development

use super::{SimpleTable, TableRecord};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory table implementation
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
#[derive(Clone)]
pub struct InMemoryTable<R: TableRecord> {
    records: Arc<RwLock<HashMap<String, R>>>,
}

impl<R: TableRecord> InMemoryTable<R> {
    /// Create a new empty in-memory table
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: TableRecord> Default for InMemoryTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: TableRecord> SimpleTable<R> for InMemoryTable<R> {
    async fn get(&self, id: &str) -> Result<Option<R>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.get(id).cloned())
    }

    async fn insert(&self, record: R) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.insert(record.record_id().to_string(), record);

        Ok(())
    }

    async fn scan(&self) -> Result<Vec<R>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.values().cloned().collect())
    }

    async fn scan_batched(
        &self,
        callback: &mut (dyn for<'a> FnMut(&'a [R]) -> bool + Send),
    ) -> Result<()> {
        let snapshot = self.scan().await?;
        for record in snapshot {
            if !callback(std::slice::from_ref(&record)) {
                break;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.remove(id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: String,
        body: String,
    }

    impl TableRecord for Doc {
        fn record_id(&self) -> &str {
            &self.id
        }
    }

    fn doc(id: &str, body: &str) -> Doc {
        Doc {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let table = InMemoryTable::new();
        table.insert(doc("a", "first")).await.unwrap();

        let got = table.get("a").await.unwrap();
        assert_eq!(got, Some(doc("a", "first")));
        assert_eq!(table.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_upserts() {
        let table = InMemoryTable::new();
        table.insert(doc("a", "first")).await.unwrap();
        table.insert(doc("a", "second")).await.unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a").await.unwrap().unwrap().body, "second");
    }

    #[tokio::test]
    async fn test_scan_returns_all() {
        let table = InMemoryTable::new();
        table.insert(doc("a", "1")).await.unwrap();
        table.insert(doc("b", "2")).await.unwrap();

        let all = table.scan().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_batched_can_stop_early() {
        let table = InMemoryTable::new();
        table.insert(doc("a", "1")).await.unwrap();
        table.insert(doc("b", "2")).await.unwrap();
        table.insert(doc("c", "3")).await.unwrap();

        let mut seen = 0;
        table
            .scan_batched(&mut |batch: &[Doc]| {
                seen += batch.len();
                seen < 2
            })
            .await
            .unwrap();

        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let table = InMemoryTable::new();
        table.insert(doc("a", "1")).await.unwrap();

        table.delete("a").await.unwrap();
        assert!(table.is_empty());

        // Deleting an absent record is a no-op
        table.delete("a").await.unwrap();
        table.delete("never-existed").await.unwrap();
    }
}
