//! Application state wiring the store together.
//!
//! AppState pins the generic `ConversationStore` to the SQLite collection and
//! runs index initialization once, before any command touches the store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chatlog_core::chat::indexes::initialize_indexes;
use chatlog_core::chat::store::{ConversationStore, ConversationStoreConfig};
use chatlog_infra::config::load_config;
use chatlog_infra::sqlite::collection::SqliteCollection;
use chatlog_infra::sqlite::pool::{DatabasePool, default_data_dir};
use chatlog_infra::sqlite::ttl::TtlMonitor;
use chatlog_types::config::MemoryConfig;

/// Concrete store type pinned to the infra implementation.
pub type ConcreteStore = ConversationStore<SqliteCollection>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConcreteStore>,
    pub collection: SqliteCollection,
    pub config: MemoryConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize from the default data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_in(default_data_dir()).await
    }

    /// Connect to `{data_dir}/chatlog.db`, load `{data_dir}/config.toml`,
    /// run index initialization when enabled, then sweep expired records.
    pub async fn init_in(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let db_pool = DatabasePool::open_in(&data_dir)
            .await
            .context("failed to open database")?;

        let config = load_config(&data_dir).await;
        let collection = SqliteCollection::new(db_pool);

        // Startup aborts if the indexes cannot be reconciled
        initialize_indexes(collection.clone(), &config)
            .await
            .context("index initialization failed")?;

        // Records past their TTL must not be readable by the command that follows
        let purged = TtlMonitor::new(collection.clone())
            .sweep()
            .await
            .context("expiry sweep failed")?;
        if purged > 0 {
            tracing::debug!(purged, "expired records removed at startup");
        }

        let store_config = ConversationStoreConfig::builder()
            .collection(collection.clone())
            .build()?;

        Ok(Self {
            store: Arc::new(ConversationStore::new(store_config)),
            collection,
            config,
            data_dir,
        })
    }
}
