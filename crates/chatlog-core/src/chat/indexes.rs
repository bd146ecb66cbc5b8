//! Index initialization for the conversation records collection.
//!
//! The host process calls [`initialize_indexes`] once during startup, after
//! the collection is reachable. It ensures the compound lookup index and, when
//! a TTL is configured, reconciles the TTL index with the configured expiry.
//!
//! Failures are never retried: running with a wrong or missing index is a
//! configuration error, so the caller should abort startup.

use chatlog_types::config::MemoryConfig;
use chatlog_types::error::IndexError;
use chatlog_types::index::IndexModel;

use crate::collection::DocumentCollection;

/// What an initialization run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Indexes ensured, in order.
    pub ensured: Vec<String>,
    /// TTL indexes dropped because their expiry differed from the config.
    pub dropped: Vec<String>,
}

/// Makes the collection's indexes match a `MemoryConfig`.
///
/// Not safe to run concurrently with itself.
pub struct IndexMaintainer<C: DocumentCollection> {
    collection: C,
    config: MemoryConfig,
}

impl<C: DocumentCollection> IndexMaintainer<C> {
    pub fn new(collection: C, config: MemoryConfig) -> Self {
        Self { collection, config }
    }

    /// Ensure the lookup index and reconcile the TTL index.
    ///
    /// With a zero TTL no TTL index is created, and existing ones are left
    /// in place.
    pub async fn run(&self) -> Result<IndexReport, IndexError> {
        self.config.validate()?;
        tracing::info!(ttl_secs = self.config.ttl.as_secs(), "creating conversation indexes");

        let mut report = IndexReport::default();
        report
            .ensured
            .push(self.ensure(&IndexModel::conversation_lookup()).await?);

        if self.config.ttl_enabled() {
            let ttl = self.config.ttl;
            let installed = self.collection.list_indexes().await.map_err(IndexError::List)?;

            for index in installed {
                let Some(expire_after) = index.expire_after else {
                    continue;
                };
                if expire_after == ttl {
                    continue;
                }

                tracing::warn!(
                    index = %index.name,
                    installed_secs = expire_after.as_secs(),
                    configured_secs = ttl.as_secs(),
                    "dropping TTL index because the TTL changed"
                );
                self.collection
                    .drop_index(&index.name)
                    .await
                    .map_err(|source| IndexError::Drop {
                        name: index.name.clone(),
                        source,
                    })?;
                report.dropped.push(index.name);
            }

            report.ensured.push(self.ensure(&IndexModel::timestamp_ttl(ttl)).await?);
        }

        Ok(report)
    }

    async fn ensure(&self, model: &IndexModel) -> Result<String, IndexError> {
        self.collection
            .create_index(model)
            .await
            .map_err(|source| IndexError::Ensure {
                name: model.name(),
                source,
            })
    }
}

/// Run index initialization if `create_indexes` is set.
///
/// Returns `None` when disabled by configuration.
pub async fn initialize_indexes<C: DocumentCollection>(
    collection: C,
    config: &MemoryConfig,
) -> Result<Option<IndexReport>, IndexError> {
    if !config.create_indexes {
        tracing::debug!("index creation disabled, skipping");
        return Ok(None);
    }

    IndexMaintainer::new(collection, config.clone())
        .run()
        .await
        .map(Some)
}
