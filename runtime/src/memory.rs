//! In-memory storage backends.
//!
//! Used by the server binary when no external store is configured, and by
//! tests. Both stores enforce the same contract a remote store would: the
//! table rejects batches above its ceiling and the blob store reports
//! `NotFound` for missing keys.

use murmur_core::store::StoreFuture;
use murmur_core::{BatchWriteOutcome, BlobStore, Item, RecordKey, StoreError, TableStore};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// Per-call item ceiling of the in-memory table.
pub const IN_MEMORY_BATCH_LIMIT: usize = 25;

/// In-memory table store.
///
/// Items are kept ordered by key, so queries and scans return them in
/// key order. Batch deletes always apply in full.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    items: RwLock<BTreeMap<RecordKey, serde_json::Value>>,
}

impl InMemoryTableStore {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the table holds no items.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Whether an item exists under `key`.
    pub async fn contains(&self, key: &RecordKey) -> bool {
        self.items.read().await.contains_key(key)
    }
}

impl TableStore for InMemoryTableStore {
    fn batch_limit(&self) -> usize {
        IN_MEMORY_BATCH_LIMIT
    }

    fn get_item<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, Option<Item>> {
        Box::pin(async move {
            let items = self.items.read().await;
            Ok(items.get(key).map(|body| Item {
                key: key.clone(),
                body: body.clone(),
            }))
        })
    }

    fn put_item(&self, item: Item) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.items.write().await.insert(item.key, item.body);
            Ok(())
        })
    }

    fn delete_item<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.items.write().await.remove(key).is_some()) })
    }

    fn query<'a>(
        &'a self,
        partition_key: &'a str,
        sort_prefix: &'a str,
    ) -> StoreFuture<'a, Vec<Item>> {
        Box::pin(async move {
            let items = self.items.read().await;
            Ok(items
                .iter()
                .filter(|(key, _)| {
                    key.partition_key == partition_key && key.sort_key.starts_with(sort_prefix)
                })
                .map(|(key, body)| Item {
                    key: key.clone(),
                    body: body.clone(),
                })
                .collect())
        })
    }

    fn scan<'a>(&'a self, sort_prefix: &'a str) -> StoreFuture<'a, Vec<Item>> {
        Box::pin(async move {
            let items = self.items.read().await;
            Ok(items
                .iter()
                .filter(|(key, _)| key.sort_key.starts_with(sort_prefix))
                .map(|(key, body)| Item {
                    key: key.clone(),
                    body: body.clone(),
                })
                .collect())
        })
    }

    fn batch_delete(&self, keys: Vec<RecordKey>) -> StoreFuture<'_, BatchWriteOutcome> {
        Box::pin(async move {
            if keys.len() > IN_MEMORY_BATCH_LIMIT {
                return Err(StoreError::BatchTooLarge {
                    size: keys.len(),
                    limit: IN_MEMORY_BATCH_LIMIT,
                });
            }

            let mut items = self.items.write().await;
            for key in &keys {
                items.remove(key);
            }
            Ok(BatchWriteOutcome::complete())
        })
    }
}

/// URL scheme of upload slots handed out by [`InMemoryBlobStore`].
pub const IN_MEMORY_UPLOAD_SCHEME: &str = "memory://";

/// In-memory blob store holding only keys.
///
/// There is nowhere to send bytes to, so
/// [`prepare_upload`](BlobStore::prepare_upload) registers the key at once.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    keys: RwLock<BTreeSet<String>>,
}

impl InMemoryBlobStore {
    /// Create an empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an uploaded blob under `key`.
    pub async fn insert(&self, key: impl Into<String>) {
        self.keys.write().await.insert(key.into());
    }
}

impl BlobStore for InMemoryBlobStore {
    fn exists<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.keys.read().await.contains(key)) })
    }

    fn prepare_upload<'a>(
        &'a self,
        key: &'a str,
        _content_type: &'a str,
    ) -> StoreFuture<'a, String> {
        Box::pin(async move {
            self.keys.write().await.insert(key.to_string());
            Ok(format!("{IN_MEMORY_UPLOAD_SCHEME}{key}"))
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if self.keys.write().await.remove(key) {
                Ok(())
            } else {
                Err(StoreError::NotFound(key.to_string()))
            }
        })
    }
}
