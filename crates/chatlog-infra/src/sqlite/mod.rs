//! SQLite storage layer.
//!
//! The conversation records collection backed by SQLite with WAL mode and
//! split read/write connection pools.

pub mod collection;
pub mod pool;
pub mod ttl;
