//! Shared domain types for chatlog.
//!
//! This crate contains the types used across the chatlog workspace: chat
//! messages, persisted conversation records, index metadata, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod index;
pub mod message;
pub mod record;
