//! SQLite conversation records collection.
//!
//! Implements `DocumentCollection` from `chatlog-core` using sqlx with split
//! read/write pools. Each record is one row; the `message` column holds the
//! `{"content", "roleTag"}` document as JSON text. Timestamps are stored as
//! fixed-width RFC 3339 strings so that text order is time order.
//!
//! Indexes are real SQLite indexes mirrored in the `collection_indexes`
//! catalog table, which also records TTL expiry.

use std::time::Duration;

use chatlog_core::collection::{DocumentCollection, RecordQuery};
use chatlog_types::error::StoreError;
use chatlog_types::index::{
    FIELD_CONVERSATION_ID, FIELD_TIMESTAMP, IndexInfo, IndexKey, IndexModel, SortOrder,
};
use chatlog_types::record::{ConversationRecord, PersistedMessage};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `DocumentCollection`.
#[derive(Clone)]
pub struct SqliteCollection {
    pool: DatabasePool,
}

impl SqliteCollection {
    /// Create a new collection backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Delete every record older than the expiry of a catalogued TTL index.
    ///
    /// Returns the number of records removed.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let rows = sqlx::query(
            "SELECT name, keys, expire_after_secs FROM collection_indexes WHERE expire_after_secs IS NOT NULL",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut purged = 0;
        for row in &rows {
            let index = IndexRow::from_row(row)
                .map_err(map_sqlx_error)?
                .into_info()?;
            let Some(expire_after) = index.expire_after else {
                continue;
            };
            // Only timestamp-keyed TTL indexes can expire records.
            if index.keys.first().map(|k| k.field.as_str()) != Some(FIELD_TIMESTAMP) {
                continue;
            }

            let Some(cutoff) = expiry_cutoff(Utc::now(), expire_after) else {
                // Nothing can be older than a cutoff before the calendar starts.
                continue;
            };
            let result = sqlx::query("DELETE FROM conversation_records WHERE timestamp < ?")
                .bind(format_datetime(&cutoff))
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx_error)?;
            purged += result.rows_affected();
        }

        Ok(purged)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct RecordRow {
    conversation_id: String,
    message: String,
    timestamp: String,
}

impl RecordRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conversation_id: row.try_get("conversation_id")?,
            message: row.try_get("message")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_record(self) -> Result<ConversationRecord, StoreError> {
        let message: PersistedMessage = serde_json::from_str(&self.message)
            .map_err(|e| StoreError::Query(format!("invalid message document: {e}")))?;

        Ok(ConversationRecord {
            conversation_id: self.conversation_id,
            message,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

struct IndexRow {
    name: String,
    keys: String,
    expire_after_secs: Option<i64>,
}

impl IndexRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            name: row.try_get("name")?,
            keys: row.try_get("keys")?,
            expire_after_secs: row.try_get("expire_after_secs")?,
        })
    }

    fn into_info(self) -> Result<IndexInfo, StoreError> {
        let keys: Vec<IndexKey> = serde_json::from_str(&self.keys)
            .map_err(|e| StoreError::Query(format!("invalid index keys: {e}")))?;

        Ok(IndexInfo {
            name: self.name,
            keys,
            expire_after: self
                .expire_after_secs
                .map(|secs| Duration::from_secs(secs as u64)),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

/// `now - ttl`, or `None` when that instant is not representable.
fn expiry_cutoff(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(ttl.as_secs()).ok()?;
    let cutoff = now.checked_sub_signed(chrono::Duration::try_seconds(secs)?)?;
    (cutoff.year() >= 1).then_some(cutoff)
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Connection-level failures are `Unavailable`; everything else is a query error.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Query(err.to_string()),
    }
}

fn column_for(field: &str) -> Result<&'static str, StoreError> {
    match field {
        FIELD_CONVERSATION_ID => Ok("conversation_id"),
        FIELD_TIMESTAMP => Ok("timestamp"),
        other => Err(StoreError::Query(format!("cannot index unknown field '{other}'"))),
    }
}

fn sql_index_name(name: &str) -> String {
    format!("\"conversation_records_{name}\"")
}

fn encode_message(message: &PersistedMessage) -> Result<String, StoreError> {
    serde_json::to_string(message)
        .map_err(|e| StoreError::Query(format!("failed to serialize message: {e}")))
}

// ---------------------------------------------------------------------------
// DocumentCollection implementation
// ---------------------------------------------------------------------------

impl DocumentCollection for SqliteCollection {
    async fn insert_one(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversation_records (conversation_id, message, timestamp) VALUES (?, ?, ?)",
        )
        .bind(&record.conversation_id)
        .bind(encode_message(&record.message)?)
        .bind(format_datetime(&record.timestamp))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn insert_many(&self, records: &[ConversationRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        for record in records {
            sqlx::query(
                "INSERT INTO conversation_records (conversation_id, message, timestamp) VALUES (?, ?, ?)",
            )
            .bind(&record.conversation_id)
            .bind(encode_message(&record.message)?)
            .bind(format_datetime(&record.timestamp))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find(&self, query: &RecordQuery) -> Result<Vec<ConversationRecord>, StoreError> {
        let order = match query.sort {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT conversation_id, message, timestamp FROM conversation_records \
             WHERE conversation_id = ? ORDER BY timestamp {order}, id {order} LIMIT ?"
        );
        // SQLite treats a negative LIMIT as unbounded.
        let limit = query
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let rows = sqlx::query(&sql)
            .bind(&query.conversation_id)
            .bind(limit)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record_row = RecordRow::from_row(row).map_err(map_sqlx_error)?;
            records.push(record_row.into_record()?);
        }

        Ok(records)
    }

    async fn delete_many(&self, conversation_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM conversation_records WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, StoreError> {
        let rows =
            sqlx::query("SELECT name, keys, expire_after_secs FROM collection_indexes ORDER BY name")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(map_sqlx_error)?;

        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            let index_row = IndexRow::from_row(row).map_err(map_sqlx_error)?;
            indexes.push(index_row.into_info()?);
        }

        Ok(indexes)
    }

    async fn create_index(&self, model: &IndexModel) -> Result<String, StoreError> {
        let name = model.name();
        let columns = model
            .keys
            .iter()
            .map(|key| {
                let direction = match key.order {
                    SortOrder::Asc => "ASC",
                    SortOrder::Desc => "DESC",
                };
                column_for(&key.field).map(|column| format!("{column} {direction}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let keys_json = serde_json::to_string(&model.keys)
            .map_err(|e| StoreError::Query(format!("failed to serialize index keys: {e}")))?;
        let expire_after_secs = model
            .expire_after
            .map(|d| {
                i64::try_from(d.as_secs())
                    .map_err(|_| StoreError::Query(format!("expiry {d:?} is out of range")))
            })
            .transpose()?;

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let existing = sqlx::query(
            "SELECT name, keys, expire_after_secs FROM collection_indexes WHERE name = ?",
        )
        .bind(&name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = existing {
            let existing = IndexRow::from_row(&row)
                .map_err(map_sqlx_error)?
                .into_info()?;
            if existing.keys == model.keys && existing.expire_after == model.expire_after {
                return Ok(name);
            }
            return Err(StoreError::IndexConflict { name });
        }

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON conversation_records ({})",
            sql_index_name(&name),
            columns.join(", ")
        ))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO collection_indexes (name, keys, expire_after_secs) VALUES (?, ?, ?)",
        )
        .bind(&name)
        .bind(keys_json)
        .bind(expire_after_secs)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(index = %name, "created index");
        Ok(name)
    }

    async fn drop_index(&self, name: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM collection_indexes WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::IndexNotFound(name.to_string()));
        }

        sqlx::query(&format!("DROP INDEX IF EXISTS {}", sql_index_name(name)))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(index = name, "dropped index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlog_core::chat::indexes::IndexMaintainer;
    use chatlog_core::chat::store::{ConversationStore, ConversationStoreConfig};
    use chatlog_types::config::MemoryConfig;
    use chatlog_types::message::Message;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_store(collection: SqliteCollection) -> ConversationStore<SqliteCollection> {
        let config = ConversationStoreConfig::builder()
            .collection(collection)
            .build()
            .unwrap();
        ConversationStore::new(config)
    }

    fn raw_record(
        conversation_id: &str,
        content: &str,
        role_tag: &str,
        timestamp: DateTime<Utc>,
    ) -> ConversationRecord {
        ConversationRecord {
            conversation_id: conversation_id.to_string(),
            message: PersistedMessage {
                content: content.to_string(),
                role_tag: role_tag.to_string(),
            },
            timestamp,
        }
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = a + chrono::Duration::microseconds(1);
        assert_eq!(format_datetime(&a).len(), format_datetime(&b).len());
        assert!(format_datetime(&a) < format_datetime(&b));
    }

    #[test]
    fn test_expiry_cutoff_out_of_range() {
        let now = Utc::now();
        assert_eq!(
            expiry_cutoff(now, Duration::from_secs(60)),
            Some(now - chrono::Duration::seconds(60))
        );
        assert!(expiry_cutoff(now, Duration::from_secs(10_000_000_000_000)).is_none());
        assert!(expiry_cutoff(now, Duration::from_secs(u64::MAX)).is_none());
    }

    #[tokio::test]
    async fn test_purge_with_huge_ttl_keeps_records() {
        let collection = SqliteCollection::new(test_pool().await);
        collection
            .insert_one(&raw_record("c1", "old", "USER", Utc::now() - chrono::Duration::days(365)))
            .await
            .unwrap();
        IndexMaintainer::new(
            collection.clone(),
            MemoryConfig {
                create_indexes: true,
                ttl: Duration::from_secs(10_000_000_000_000),
            },
        )
        .run()
        .await
        .unwrap();

        assert_eq!(collection.purge_expired().await.unwrap(), 0);
        assert_eq!(
            collection
                .find(&RecordQuery::most_recent("c1", 10))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_index_rejects_unrepresentable_expiry() {
        let collection = SqliteCollection::new(test_pool().await);
        assert!(matches!(
            collection
                .create_index(&IndexModel::timestamp_ttl(Duration::from_secs(u64::MAX)))
                .await,
            Err(StoreError::Query(_))
        ));
    }

    #[tokio::test]
    async fn test_message_stored_as_document() {
        let pool = test_pool().await;
        let collection = SqliteCollection::new(pool.clone());
        collection
            .insert_one(&raw_record("c1", "hi", "USER", Utc::now()))
            .await
            .unwrap();

        let (message,): (String,) =
            sqlx::query_as("SELECT message FROM conversation_records WHERE conversation_id = 'c1'")
                .fetch_one(&pool.reader)
                .await
                .unwrap();
        let doc: serde_json::Value = serde_json::from_str(&message).unwrap();
        assert_eq!(doc["content"], "hi");
        assert_eq!(doc["roleTag"], "USER");
    }

    #[tokio::test]
    async fn test_find_breaks_timestamp_ties_by_insertion() {
        let collection = SqliteCollection::new(test_pool().await);
        let now = Utc::now();
        collection
            .insert_many(&[
                raw_record("c1", "a", "USER", now),
                raw_record("c1", "b", "ASSISTANT", now),
                raw_record("c1", "c", "USER", now),
            ])
            .await
            .unwrap();

        let found = collection
            .find(&RecordQuery::most_recent("c1", 2))
            .await
            .unwrap();
        let contents: Vec<&str> = found.iter().map(|r| r.message.content.as_str()).collect();
        assert_eq!(contents, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_store_order_and_bounding() {
        let store = make_store(SqliteCollection::new(test_pool().await));

        store
            .append_all(
                "c1",
                &[Message::user("m1"), Message::assistant("m2"), Message::user("m3")],
            )
            .await
            .unwrap();
        assert_eq!(
            store.recent_messages("c1", 10).await.unwrap(),
            vec![Message::user("m1"), Message::assistant("m2"), Message::user("m3")]
        );

        for i in 4..=5 {
            store
                .append("c1", &Message::user(format!("m{i}")))
                .await
                .unwrap();
        }
        assert_eq!(
            store.recent_messages("c1", 2).await.unwrap(),
            vec![Message::user("m4"), Message::user("m5")]
        );
    }

    #[tokio::test]
    async fn test_store_scenario() {
        let store = make_store(SqliteCollection::new(test_pool().await));

        store.append("abc", &Message::system("hello")).await.unwrap();
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

    #[tokio::test]
    async fn test_unknown_role_skipped() {
        let collection = SqliteCollection::new(test_pool().await);
        let store = make_store(collection.clone());

        store.append("c1", &Message::user("valid")).await.unwrap();
        collection
            .insert_one(&raw_record("c1", "x", "MODERATOR", Utc::now()))
            .await
            .unwrap();

        assert_eq!(
            store.recent_messages("c1", 10).await.unwrap(),
            vec![Message::user("valid")]
        );
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let collection = SqliteCollection::new(test_pool().await);
        let store = make_store(collection.clone());
        store.append("c1", &Message::user("a")).await.unwrap();
        store.append("c2", &Message::user("b")).await.unwrap();

        store.clear("c1").await.unwrap();
        store.clear("c1").await.unwrap();

        assert!(store.recent_messages("c1", 10).await.unwrap().is_empty());
        assert_eq!(store.recent_messages("c2", 10).await.unwrap().len(), 1);
        assert_eq!(collection.delete_many("c1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let pool = test_pool().await;
        let store = make_store(SqliteCollection::new(pool.clone()));
        pool.close().await;

        assert!(matches!(
            store.append("c1", &Message::user("hi")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.recent_messages("c1", 1).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_create_index_creates_sqlite_index() {
        let pool = test_pool().await;
        let collection = SqliteCollection::new(pool.clone());

        let name = collection
            .create_index(&IndexModel::conversation_lookup())
            .await
            .unwrap();
        assert_eq!(name, "conversationId_1_timestamp_-1");

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'conversation_records' AND name LIKE 'conversation_records_%'",
        )
        .fetch_one(&pool.reader)
        .await
        .unwrap();
        assert_eq!(count, 1);

        // Second call is a no-op
        collection
            .create_index(&IndexModel::conversation_lookup())
            .await
            .unwrap();
        assert_eq!(collection.list_indexes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_index_conflict_and_drop() {
        let collection = SqliteCollection::new(test_pool().await);
        collection
            .create_index(&IndexModel::timestamp_ttl(Duration::from_secs(60)))
            .await
            .unwrap();

        assert!(matches!(
            collection
                .create_index(&IndexModel::timestamp_ttl(Duration::from_secs(90)))
                .await,
            Err(StoreError::IndexConflict { .. })
        ));

        collection.drop_index("timestamp_1").await.unwrap();
        assert!(collection.list_indexes().await.unwrap().is_empty());
        assert!(matches!(
            collection.drop_index("timestamp_1").await,
            Err(StoreError::IndexNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ttl_reconciliation_against_sqlite() {
        let collection = SqliteCollection::new(test_pool().await);
        let config = |secs| MemoryConfig {
            create_indexes: true,
            ttl: Duration::from_secs(secs),
        };

        IndexMaintainer::new(collection.clone(), config(60))
            .run()
            .await
            .unwrap();
        IndexMaintainer::new(collection.clone(), config(300))
            .run()
            .await
            .unwrap();

        let indexes = collection.list_indexes().await.unwrap();
        let ttl: Vec<&IndexInfo> = indexes.iter().filter(|i| i.is_ttl()).collect();
        assert_eq!(indexes.len(), 2);
        assert_eq!(ttl.len(), 1);
        assert_eq!(ttl[0].expire_after, Some(Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn test_purge_expired_removes_old_records() {
        let collection = SqliteCollection::new(test_pool().await);
        let now = Utc::now();
        collection
            .insert_many(&[
                raw_record("c1", "old", "USER", now - chrono::Duration::hours(2)),
                raw_record("c1", "fresh", "USER", now),
            ])
            .await
            .unwrap();

        // Without a TTL index nothing expires
        assert_eq!(collection.purge_expired().await.unwrap(), 0);

        collection
            .create_index(&IndexModel::timestamp_ttl(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert_eq!(collection.purge_expired().await.unwrap(), 1);

        let remaining = collection
            .find(&RecordQuery::most_recent("c1", 10))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message.content, "fresh");
    }
}
