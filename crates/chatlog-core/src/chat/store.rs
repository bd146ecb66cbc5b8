//! Conversation store.
//!
//! Appends messages to a conversation, reads back the most recent ones in
//! chronological order, and clears a conversation. Every call is a fresh
//! round trip to the collection; nothing is cached and nothing is retried.

use chatlog_types::error::{ConfigError, StoreError};
use chatlog_types::message::Message;
use chatlog_types::record::ConversationRecord;
use chrono::Utc;

use super::codec::{self, Decoded};
use crate::collection::{DocumentCollection, RecordQuery};

/// Validated settings for a `ConversationStore`.
pub struct ConversationStoreConfig<C> {
    collection: C,
}

impl<C: DocumentCollection> ConversationStoreConfig<C> {
    pub fn builder() -> ConversationStoreConfigBuilder<C> {
        ConversationStoreConfigBuilder { collection: None }
    }
}

/// Builder for `ConversationStoreConfig`. The collection is required.
pub struct ConversationStoreConfigBuilder<C> {
    collection: Option<C>,
}

impl<C: DocumentCollection> ConversationStoreConfigBuilder<C> {
    pub fn collection(mut self, collection: C) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn build(self) -> Result<ConversationStoreConfig<C>, ConfigError> {
        let collection = self.collection.ok_or(ConfigError::MissingCollection)?;
        Ok(ConversationStoreConfig { collection })
    }
}

/// Message history keyed by conversation id.
///
/// Generic over `DocumentCollection` so chatlog-core never depends on
/// chatlog-infra.
pub struct ConversationStore<C: DocumentCollection> {
    collection: C,
}

impl<C: DocumentCollection> ConversationStore<C> {
    pub fn new(config: ConversationStoreConfig<C>) -> Self {
        Self {
            collection: config.collection,
        }
    }

    /// Access the underlying collection.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Append one message. The store assigns the timestamp.
    pub async fn append(&self, conversation_id: &str, message: &Message) -> Result<(), StoreError> {
        let record = ConversationRecord {
            conversation_id: conversation_id.to_string(),
            message: codec::encode(message),
            timestamp: Utc::now(),
        };
        self.collection.insert_one(&record).await?;

        tracing::debug!(conversation_id, role = %message.role, "appended message");
        Ok(())
    }

    /// Append a batch of messages in order.
    ///
    /// All records of the batch share one timestamp; their relative order is
    /// kept by insertion order. An empty batch is a no-op.
    pub async fn append_all(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let records: Vec<ConversationRecord> = messages
            .iter()
            .map(|message| ConversationRecord {
                conversation_id: conversation_id.to_string(),
                message: codec::encode(message),
                timestamp: now,
            })
            .collect();
        self.collection.insert_many(&records).await?;

        tracing::debug!(conversation_id, count = records.len(), "appended messages");
        Ok(())
    }

    /// Up to `limit` most recent messages, oldest first.
    ///
    /// Records with an unknown role tag are dropped with a warning, so the
    /// result may be shorter than `limit` even when more records exist.
    /// A `limit` of zero or less returns an empty list.
    pub async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let mut records = self
            .collection
            .find(&RecordQuery::most_recent(conversation_id, limit as u64))
            .await?;
        records.reverse();

        let mut messages = Vec::with_capacity(records.len());
        for record in &records {
            match codec::decode(&record.message) {
                Decoded::Message(message) => messages.push(message),
                Decoded::Unmappable { role_tag } => {
                    tracing::warn!(
                        conversation_id,
                        role_tag = %role_tag,
                        "skipping record with unsupported role tag"
                    );
                }
            }
        }

        Ok(messages)
    }

    /// Delete every message of a conversation. Clearing an empty or unknown
    /// conversation succeeds.
    pub async fn clear(&self, conversation_id: &str) -> Result<(), StoreError> {
        let deleted = self.collection.delete_many(conversation_id).await?;

        tracing::debug!(conversation_id, deleted, "cleared conversation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::memory::InMemoryCollection;
    use chatlog_types::record::PersistedMessage;

    fn make_store() -> (ConversationStore<InMemoryCollection>, InMemoryCollection) {
        let collection = InMemoryCollection::new();
        let config = ConversationStoreConfig::builder()
            .collection(collection.clone())
            .build()
            .unwrap();
        (ConversationStore::new(config), collection)
    }

    fn raw_record(conversation_id: &str, content: &str, role_tag: &str) -> ConversationRecord {
        ConversationRecord {
            conversation_id: conversation_id.to_string(),
            message: PersistedMessage {
                content: content.to_string(),
                role_tag: role_tag.to_string(),
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_build_without_collection_fails() {
        let result = ConversationStoreConfig::<InMemoryCollection>::builder().build();
        assert!(matches!(result, Err(ConfigError::MissingCollection)));
    }

    #[tokio::test]
    async fn test_append_single_then_read() {
        let (store, _) = make_store();
        let message = Message::assistant("Message from assistant");

        store.append("c1", &message).await.unwrap();

        let messages = store.recent_messages("c1", 1).await.unwrap();
        assert_eq!(messages, vec![message]);
    }

    #[tokio::test]
    async fn test_order_is_preserved() {
        let (store, _) = make_store();
        let batch = vec![
            Message::user("m1"),
            Message::assistant("m2"),
            Message::user("m3"),
        ];

        store.append_all("c1", &batch).await.unwrap();

        assert_eq!(store.recent_messages("c1", 10).await.unwrap(), batch);
    }

    #[tokio::test]
    async fn test_limit_bounds_to_most_recent() {
        let (store, _) = make_store();
        for i in 1..=5 {
            store
                .append("c1", &Message::user(format!("m{i}")))
                .await
                .unwrap();
        }

        let messages = store.recent_messages("c1", 2).await.unwrap();
        assert_eq!(messages, vec![Message::user("m4"), Message::user("m5")]);
    }

    #[tokio::test]
    async fn test_non_positive_limit_returns_empty() {
        let (store, _) = make_store();
        store.append("c1", &Message::user("hi")).await.unwrap();

        assert!(store.recent_messages("c1", 0).await.unwrap().is_empty());
        assert!(store.recent_messages("c1", -3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_larger_than_history_returns_all() {
        let (store, _) = make_store();
        store
            .append_all("c1", &[Message::user("a"), Message::assistant("b")])
            .await
            .unwrap();

        let messages = store.recent_messages("c1", 100).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "a");
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let (store, _) = make_store();
        store.append("c1", &Message::user("one")).await.unwrap();
        store.append("c2", &Message::user("two")).await.unwrap();

        assert_eq!(
            store.recent_messages("c1", 10).await.unwrap(),
            vec![Message::user("one")]
        );
    }

    #[tokio::test]
    async fn test_clear_is_destructive_and_idempotent() {
        let (store, collection) = make_store();
        store
            .append_all("c1", &[Message::user("a"), Message::assistant("b")])
            .await
            .unwrap();
        store.append("c2", &Message::user("keep")).await.unwrap();

        store.clear("c1").await.unwrap();
        assert!(store.recent_messages("c1", i64::MAX).await.unwrap().is_empty());

        store.clear("c1").await.unwrap();
        store.clear("never-existed").await.unwrap();
        assert_eq!(collection.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_role_is_skipped() {
        let (store, collection) = make_store();
        store.append("c1", &Message::user("before")).await.unwrap();
        collection
            .insert_one(&raw_record("c1", "quiet please", "MODERATOR"))
            .await
            .unwrap();
        store.append("c1", &Message::assistant("after")).await.unwrap();

        let messages = store.recent_messages("c1", 10).await.unwrap();
        assert_eq!(
            messages,
            vec![Message::user("before"), Message::assistant("after")]
        );
    }

    #[tokio::test]
    async fn test_skipped_records_still_count_toward_limit() {
        let (store, collection) = make_store();
        store.append("c1", &Message::user("old")).await.unwrap();
        collection
            .insert_one(&raw_record("c1", "x", "MODERATOR"))
            .await
            .unwrap();

        let messages = store.recent_messages("c1", 1).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let (store, collection) = make_store();
        store.append_all("c1", &[]).await.unwrap();
        assert!(collection.is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_store_propagates() {
        let (store, collection) = make_store();
        collection.set_available(false);

        assert!(matches!(
            store.append("c1", &Message::user("hi")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.recent_messages("c1", 5).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.clear("c1").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_scenario_system_then_batch() {
        let (store, _) = make_store();

        store.append("abc", &Message::system("hello")).await.unwrap();
        assert_eq!(
            store.recent_messages("abc", 2147483647).await.unwrap(),
            vec![Message::system("hello")]
        );

        store
            .append_all("abc", &[Message::user("hi"), Message::assistant("yo")])
            .await
            .unwrap();
        assert_eq!(
            store.recent_messages("abc", 2147483647).await.unwrap(),
            vec![
                Message::system("hello"),
                Message::user("hi"),
                Message::assistant("yo"),
            ]
        );
    }
}
