//! Conversation storage logic and collection trait definitions for chatlog.
//!
//! This crate defines the `DocumentCollection` port that the infrastructure
//! layer implements, plus everything that runs on top of it: the message
//! codec, the conversation store, and index initialization. It depends only
//! on `chatlog-types` -- never on `chatlog-infra` or any database crate.

pub mod chat;
pub mod collection;
