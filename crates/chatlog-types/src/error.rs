use thiserror::Error;

/// Errors from the document collection (used by trait definitions in chatlog-core).
///
/// Store operations hand these back untranslated.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("index '{name}' already exists with different options")]
    IndexConflict { name: String },

    #[error("index '{0}' not found")]
    IndexNotFound(String),
}

/// Errors raised while building a store or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a document collection must be provided")]
    MissingCollection,

    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
}

/// Errors from index reconciliation at startup. None of these are recovered.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to list indexes: {0}")]
    List(#[source] StoreError),

    #[error("failed to ensure index '{name}': {source}")]
    Ensure {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to drop index '{name}': {source}")]
    Drop {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
