//! Conversation history on top of a `DocumentCollection`.
//!
//! - `codec`: message <-> persisted record mapping
//! - `store`: append / recent / clear for a conversation
//! - `indexes`: one-shot index initialization at startup

pub mod codec;
pub mod indexes;
pub mod store;
