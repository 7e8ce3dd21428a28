//! Scripted storage doubles.
//!
//! [`ScriptedTableStore`] behaves like a real table store for single-item
//! calls, but lets a test decide how each `batch_delete` call is answered and
//! records every call in an [`Operation`] log. [`ScriptedBlobStore`] shares that
//! log so the relative order of table and blob calls can be asserted.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use murmur_core::store::StoreFuture;
use murmur_core::{
    BatchWriteOutcome, BlobStore, Comment, Item, Post, RecordKey, StoreError, TableStore,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// How one `batch_delete` call is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRule {
    /// Apply every key.
    AcceptAll,
    /// Leave the last `n` keys of the call unapplied (all of them if fewer).
    RejectLast(usize),
    /// Leave every key unapplied.
    RejectAll,
    /// Fail the call outright without applying anything.
    Fail(String),
}

/// One recorded storage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `get_item`
    Get(RecordKey),
    /// `put_item`
    Put(RecordKey),
    /// `delete_item`
    Delete(RecordKey),
    /// `query` / `query_keys`
    Query {
        /// Partition queried
        partition_key: String,
        /// Sort-key prefix
        sort_prefix: String,
    },
    /// `scan`
    Scan(String),
    /// `batch_delete`, with the keys submitted
    BatchDelete(Vec<RecordKey>),
    /// Blob `exists`
    BlobExists(String),
    /// Blob `delete`
    BlobDelete(String),
    /// Blob `prepare_upload`
    BlobUpload(String),
}

#[derive(Debug)]
struct TableState {
    items: BTreeMap<RecordKey, serde_json::Value>,
    script: VecDeque<BatchRule>,
    default_rule: BatchRule,
    batch_limit: usize,
    delete_counts: HashMap<RecordKey, usize>,
    rejecting_puts: bool,
}

type Log = Arc<Mutex<Vec<Operation>>>;

/// Table store whose batch behaviour is scripted per call.
///
/// # Example
///
/// ```
/// use murmur_testing::{BatchRule, ScriptedTableStore};
///
/// let table = ScriptedTableStore::new();
/// // First batch call leaves 3 keys unapplied, later calls apply everything.
/// table.script([BatchRule::RejectLast(3)]);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedTableStore {
    state: Arc<Mutex<TableState>>,
    log: Log,
}

impl ScriptedTableStore {
    /// Create an empty table with a batch limit of 25 that accepts every batch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TableState {
                items: BTreeMap::new(),
                script: VecDeque::new(),
                default_rule: BatchRule::AcceptAll,
                batch_limit: 25,
                delete_counts: HashMap::new(),
                rejecting_puts: false,
            })),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Change the per-call batch ceiling.
    #[must_use]
    pub fn with_batch_limit(self, limit: usize) -> Self {
        self.state.lock().unwrap().batch_limit = limit;
        self
    }

    /// Queue rules for the next batch calls, consumed one per call.
    pub fn script(&self, rules: impl IntoIterator<Item = BatchRule>) {
        self.state.lock().unwrap().script.extend(rules);
    }

    /// Rule applied once the script is used up.
    pub fn set_default_rule(&self, rule: BatchRule) {
        self.state.lock().unwrap().default_rule = rule;
    }

    /// Make every subsequent `put_item` fail with [`StoreError::Unavailable`].
    pub fn set_rejecting_puts(&self, rejecting: bool) {
        self.state.lock().unwrap().rejecting_puts = rejecting;
    }

    /// A blob store sharing this table's operation log.
    #[must_use]
    pub fn blob_store(&self) -> ScriptedBlobStore {
        ScriptedBlobStore {
            state: Arc::new(Mutex::new(BlobState::default())),
            log: self.log.clone(),
        }
    }

    /// Store a post directly, bypassing the log.
    pub fn seed_post(&self, post: &Post) {
        self.seed(post.key(), post);
    }

    /// Store comments directly, bypassing the log.
    pub fn seed_comments(&self, comments: &[Comment]) {
        for comment in comments {
            self.seed(comment.key(), comment);
        }
    }

    fn seed<T: serde::Serialize>(&self, key: RecordKey, record: &T) {
        let body = serde_json::to_value(record).unwrap();
        self.state.lock().unwrap().items.insert(key, body);
    }

    /// Whether an item exists under `key`.
    #[must_use]
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.state.lock().unwrap().items.contains_key(key)
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Whether the table holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `key` was actually removed by a batch or single delete.
    #[must_use]
    pub fn delete_count(&self, key: &RecordKey) -> usize {
        self.state
            .lock()
            .unwrap()
            .delete_counts
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Every call recorded so far, table and blob, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.log.lock().unwrap().clone()
    }

    /// Sizes of every `batch_delete` call, in order.
    #[must_use]
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::BatchDelete(keys) => Some(keys.len()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, operation: Operation) {
        self.log.lock().unwrap().push(operation);
    }

    fn matching(&self, predicate: impl Fn(&RecordKey) -> bool) -> Vec<Item> {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, body)| Item {
                key: key.clone(),
                body: body.clone(),
            })
            .collect()
    }
}

impl Default for ScriptedTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore for ScriptedTableStore {
    fn batch_limit(&self) -> usize {
        self.state.lock().unwrap().batch_limit
    }

    fn get_item<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, Option<Item>> {
        self.record(Operation::Get(key.clone()));
        let item = self.state.lock().unwrap().items.get(key).map(|body| Item {
            key: key.clone(),
            body: body.clone(),
        });
        Box::pin(async move { Ok(item) })
    }

    fn put_item(&self, item: Item) -> StoreFuture<'_, ()> {
        self.record(Operation::Put(item.key.clone()));
        let mut state = self.state.lock().unwrap();
        if state.rejecting_puts {
            let err = StoreError::Unavailable("table write rejected".to_string());
            return Box::pin(async move { Err(err) });
        }
        state.items.insert(item.key, item.body);
        Box::pin(async { Ok(()) })
    }

    fn delete_item<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, bool> {
        self.record(Operation::Delete(key.clone()));
        let existed = {
            let mut state = self.state.lock().unwrap();
            let existed = state.items.remove(key).is_some();
            if existed {
                *state.delete_counts.entry(key.clone()).or_default() += 1;
            }
            existed
        };
        Box::pin(async move { Ok(existed) })
    }

    fn query<'a>(
        &'a self,
        partition_key: &'a str,
        sort_prefix: &'a str,
    ) -> StoreFuture<'a, Vec<Item>> {
        self.record(Operation::Query {
            partition_key: partition_key.to_string(),
            sort_prefix: sort_prefix.to_string(),
        });
        let items = self.matching(|key| {
            key.partition_key == partition_key && key.sort_key.starts_with(sort_prefix)
        });
        Box::pin(async move { Ok(items) })
    }

    fn scan<'a>(&'a self, sort_prefix: &'a str) -> StoreFuture<'a, Vec<Item>> {
        self.record(Operation::Scan(sort_prefix.to_string()));
        let items = self.matching(|key| key.sort_key.starts_with(sort_prefix));
        Box::pin(async move { Ok(items) })
    }

    fn batch_delete(&self, keys: Vec<RecordKey>) -> StoreFuture<'_, BatchWriteOutcome> {
        self.record(Operation::BatchDelete(keys.clone()));

        let result = {
            let mut state = self.state.lock().unwrap();
            if keys.len() > state.batch_limit {
                Err(StoreError::BatchTooLarge {
                    size: keys.len(),
                    limit: state.batch_limit,
                })
            } else {
                let rule = state
                    .script
                    .pop_front()
                    .unwrap_or_else(|| state.default_rule.clone());

                let rejected = match rule {
                    BatchRule::AcceptAll => 0,
                    BatchRule::RejectLast(n) => n.min(keys.len()),
                    BatchRule::RejectAll => keys.len(),
                    BatchRule::Fail(reason) => {
                        return Box::pin(async move { Err(StoreError::Unavailable(reason)) });
                    }
                };

                let (applied, unprocessed) = keys.split_at(keys.len() - rejected);
                for key in applied {
                    if state.items.remove(key).is_some() {
                        *state.delete_counts.entry(key.clone()).or_default() += 1;
                    }
                }
                Ok(BatchWriteOutcome {
                    unprocessed: unprocessed.to_vec(),
                })
            }
        };

        Box::pin(async move { result })
    }
}

#[derive(Debug, Default)]
struct BlobState {
    keys: BTreeSet<String>,
    unavailable: bool,
}

/// Blob store sharing a [`ScriptedTableStore`]'s operation log.
#[derive(Debug, Clone)]
pub struct ScriptedBlobStore {
    state: Arc<Mutex<BlobState>>,
    log: Log,
}

impl ScriptedBlobStore {
    /// Record an uploaded blob.
    pub fn insert(&self, key: impl Into<String>) {
        self.state.lock().unwrap().keys.insert(key.into());
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// Whether a blob is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().unwrap().keys.contains(key)
    }
}

impl BlobStore for ScriptedBlobStore {
    fn exists<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        self.log
            .lock()
            .unwrap()
            .push(Operation::BlobExists(key.to_string()));
        let state = self.state.lock().unwrap();
        let result = if state.unavailable {
            Err(StoreError::Unavailable("blob store offline".to_string()))
        } else {
            Ok(state.keys.contains(key))
        };
        Box::pin(async move { result })
    }

    fn prepare_upload<'a>(
        &'a self,
        key: &'a str,
        _content_type: &'a str,
    ) -> StoreFuture<'a, String> {
        self.log
            .lock()
            .unwrap()
            .push(Operation::BlobUpload(key.to_string()));
        let mut state = self.state.lock().unwrap();
        let result = if state.unavailable {
            Err(StoreError::Unavailable("blob store offline".to_string()))
        } else {
            state.keys.insert(key.to_string());
            Ok(format!("https://blobs.test/{key}"))
        };
        Box::pin(async move { result })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        self.log
            .lock()
            .unwrap()
            .push(Operation::BlobDelete(key.to_string()));
        let mut state = self.state.lock().unwrap();
        let result = if state.unavailable {
            Err(StoreError::Unavailable("blob store offline".to_string()))
        } else if state.keys.remove(key) {
            Ok(())
        } else {
            Err(StoreError::NotFound(key.to_string()))
        };
        Box::pin(async move { result })
    }
}
