//! Index metadata for the conversation records collection.
//!
//! Index names follow the document-store convention of joining each key field
//! with its direction: `conversationId_1_timestamp_-1`.

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Document field holding the conversation key.
pub const FIELD_CONVERSATION_ID: &str = "conversationId";

/// Document field holding the insertion instant.
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Sort order for index keys and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Direction number used in index names (`1` / `-1`).
    pub fn as_direction(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// One field of an index, with its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub order: SortOrder,
}

impl IndexKey {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// An index to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexModel {
    pub keys: Vec<IndexKey>,
    /// Expiry for TTL indexes. Records older than this are removed.
    pub expire_after: Option<Duration>,
}

impl IndexModel {
    pub fn new(keys: Vec<IndexKey>) -> Self {
        Self {
            keys,
            expire_after: None,
        }
    }

    pub fn expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    /// Derived index name, e.g. `timestamp_1`.
    pub fn name(&self) -> String {
        index_name(&self.keys)
    }

    /// Compound lookup index: `(conversationId asc, timestamp desc)`.
    pub fn conversation_lookup() -> Self {
        Self::new(vec![
            IndexKey::new(FIELD_CONVERSATION_ID, SortOrder::Asc),
            IndexKey::new(FIELD_TIMESTAMP, SortOrder::Desc),
        ])
    }

    /// TTL index over `timestamp asc` with the given expiry.
    pub fn timestamp_ttl(ttl: Duration) -> Self {
        Self::new(vec![IndexKey::new(FIELD_TIMESTAMP, SortOrder::Asc)]).expire_after(ttl)
    }
}

/// An index as reported by the store's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub keys: Vec<IndexKey>,
    pub expire_after: Option<Duration>,
}

impl IndexInfo {
    pub fn is_ttl(&self) -> bool {
        self.expire_after.is_some()
    }
}

pub fn index_name(keys: &[IndexKey]) -> String {
    keys.iter()
        .map(|k| format!("{}_{}", k.field, k.order.as_direction()))
        .collect::<Vec<_>>()
        .join("_")
}
