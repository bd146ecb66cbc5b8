//! In-process `DocumentCollection`.
//!
//! Keeps records and the index catalog in memory. Indexes are catalogued
//! only; expiry is not enforced. Cloning shares the underlying state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chatlog_types::error::StoreError;
use chatlog_types::index::{IndexInfo, IndexModel, SortOrder};
use chatlog_types::record::ConversationRecord;
use tokio::sync::RwLock;

use super::{DocumentCollection, RecordQuery};

#[derive(Default)]
struct Inner {
    next_seq: u64,
    records: Vec<(u64, ConversationRecord)>,
    indexes: BTreeMap<String, IndexInfo>,
}

/// Shared in-memory collection.
#[derive(Clone)]
pub struct InMemoryCollection {
    inner: Arc<RwLock<Inner>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate losing (or regaining) the storage connection.
    /// While unavailable every operation fails with `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Total number of records across all conversations.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory collection offline".to_string()))
        }
    }
}

impl Inner {
    fn push(&mut self, record: ConversationRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push((seq, record));
    }
}

impl DocumentCollection for InMemoryCollection {
    async fn insert_one(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.write().await.push(record.clone());
        Ok(())
    }

    async fn insert_many(&self, records: &[ConversationRecord]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        for record in records {
            inner.push(record.clone());
        }
        Ok(())
    }

    async fn find(&self, query: &RecordQuery) -> Result<Vec<ConversationRecord>, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;

        let mut matching: Vec<&(u64, ConversationRecord)> = inner
            .records
            .iter()
            .filter(|(_, r)| r.conversation_id == query.conversation_id)
            .collect();

        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            let ord = a.timestamp.cmp(&b.timestamp).then(seq_a.cmp(seq_b));
            match query.sort {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn delete_many(&self, conversation_id: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner
            .records
            .retain(|(_, r)| r.conversation_id != conversation_id);
        Ok((before - inner.records.len()) as u64)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, StoreError> {
        self.check_available()?;
        Ok(self.inner.read().await.indexes.values().cloned().collect())
    }

    async fn create_index(&self, model: &IndexModel) -> Result<String, StoreError> {
        self.check_available()?;
        let name = model.name();
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.indexes.get(&name) {
            if existing.keys == model.keys && existing.expire_after == model.expire_after {
                return Ok(name);
            }
            return Err(StoreError::IndexConflict { name });
        }

        inner.indexes.insert(
            name.clone(),
            IndexInfo {
                name: name.clone(),
                keys: model.keys.clone(),
                expire_after: model.expire_after,
            },
        );
        Ok(name)
    }

    async fn drop_index(&self, name: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner
            .write()
            .await
            .indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::IndexNotFound(name.to_string()))
    }
}
