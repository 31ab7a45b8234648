//! Storage for locally produced data.
//!
//! Published data is kept here and served to data interests from peers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use svsync_core::{Data, Name};

use crate::error::Result;

/// Result of inserting data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Stored under a name that was free.
    Inserted,
    /// Identical data was already stored.
    AlreadyExists,
    /// Different data is already stored under this name.
    Conflict,
}

/// Storage abstraction for data packets, keyed by exact name.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Store `data` under its name. Stored data is never replaced.
    async fn insert(&self, data: Data) -> Result<InsertResult>;

    /// Look up data by exact name.
    async fn get(&self, name: &Name) -> Result<Option<Data>>;

    /// Number of stored packets.
    async fn len(&self) -> Result<usize>;
}

/// In-memory store. All data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    inner: RwLock<HashMap<Name, Data>>,
}

impl MemoryDataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Name, Data>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Name, Data>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn insert(&self, data: Data) -> Result<InsertResult> {
        let mut inner = self.write();
        match inner.get(&data.name) {
            Some(existing) if existing.content == data.content => Ok(InsertResult::AlreadyExists),
            Some(_) => Ok(InsertResult::Conflict),
            None => {
                inner.insert(data.name.clone(), data);
                Ok(InsertResult::Inserted)
            }
        }
    }

    async fn get(&self, name: &Name) -> Result<Option<Data>> {
        Ok(self.read().get(name).cloned())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str, content: &'static [u8]) -> Data {
        Data::new(name.parse().unwrap(), content)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryDataStore::new();
        let d = data("/a/sync/1", b"hello");

        assert_eq!(store.insert(d.clone()).await.unwrap(), InsertResult::Inserted);
        assert_eq!(store.get(&d.name).await.unwrap(), Some(d));
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store
            .get(&"/a/sync/2".parse().unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reinsert_is_idempotent_and_conflicts_detected() {
        let store = MemoryDataStore::new();
        store.insert(data("/a/sync/1", b"hello")).await.unwrap();

        assert_eq!(
            store.insert(data("/a/sync/1", b"hello")).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(
            store.insert(data("/a/sync/1", b"other")).await.unwrap(),
            InsertResult::Conflict
        );
        let stored = store.get(&"/a/sync/1".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(&stored.content[..], b"hello");
    }
}
