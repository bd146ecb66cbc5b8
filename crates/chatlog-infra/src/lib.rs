//! Infrastructure layer for chatlog.
//!
//! Contains the SQLite implementation of the `DocumentCollection` trait
//! defined in `chatlog-core`, the TTL monitor that enforces index expiry,
//! and the `config.toml` loader.

pub mod config;
pub mod sqlite;
