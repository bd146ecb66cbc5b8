//! Document collection trait definition (port).
//!
//! A `DocumentCollection` is the storage client for the single conversation
//! records collection. The infrastructure layer (chatlog-infra) implements it
//! with SQLite; `memory::InMemoryCollection` implements it without IO.

pub mod memory;

use chatlog_types::error::StoreError;
use chatlog_types::index::{IndexInfo, IndexModel, SortOrder};
use chatlog_types::record::ConversationRecord;

/// Selects records of one conversation, ordered by timestamp.
///
/// Records sharing a timestamp are ordered by insertion order, in the same
/// direction as `sort`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub conversation_id: String,
    pub sort: SortOrder,
    pub limit: Option<u64>,
}

impl RecordQuery {
    /// The newest `limit` records of a conversation, newest first.
    pub fn most_recent(conversation_id: &str, limit: u64) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            sort: SortOrder::Desc,
            limit: Some(limit),
        }
    }
}

/// Storage client for the conversation records collection.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// No operation retries; transient failures surface as `StoreError::Unavailable`.
pub trait DocumentCollection: Send + Sync {
    /// Insert a single record.
    fn insert_one(
        &self,
        record: &ConversationRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Insert a batch of records, preserving their order.
    fn insert_many(
        &self,
        records: &[ConversationRecord],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Find records matching a query.
    fn find(
        &self,
        query: &RecordQuery,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationRecord>, StoreError>> + Send;

    /// Delete every record of a conversation. Returns the number deleted.
    fn delete_many(
        &self,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// List the indexes installed on the collection.
    fn list_indexes(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<IndexInfo>, StoreError>> + Send;

    /// Create an index, returning its name.
    ///
    /// No-op if an identical index exists. Returns `IndexConflict` if an index
    /// with the same name exists with different options.
    fn create_index(
        &self,
        model: &IndexModel,
    ) -> impl std::future::Future<Output = Result<String, StoreError>> + Send;

    /// Drop an index by name. Returns `IndexNotFound` for unknown names.
    fn drop_index(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
