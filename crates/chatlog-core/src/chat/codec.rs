//! Message codec.
//!
//! Converts between `Message` and the `PersistedMessage` stored inside each
//! record. Encoding is total. Decoding is total too: tags the codec does not
//! know come back as `Decoded::Unmappable` and the caller decides what to do.

use chatlog_types::message::Message;
use chatlog_types::record::{PersistedMessage, RoleTag};

/// Result of decoding a persisted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Message(Message),
    /// The record carries a role tag with no matching `MessageRole`.
    Unmappable { role_tag: String },
}

/// Encode a message for storage. The tag is the uppercase role name.
pub fn encode(message: &Message) -> PersistedMessage {
    PersistedMessage {
        content: message.text.clone(),
        role_tag: RoleTag::from(message.role).as_str().to_string(),
    }
}

/// Decode a stored message.
pub fn decode(persisted: &PersistedMessage) -> Decoded {
    match persisted.tag().role() {
        Some(role) => Decoded::Message(Message::new(role, persisted.content.clone())),
        None => Decoded::Unmappable {
            role_tag: persisted.role_tag.clone(),
        },
    }
}
