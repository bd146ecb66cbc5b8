//! Persisted conversation record types.
//!
//! One `ConversationRecord` is stored per message. The serialized shape is the
//! document layout of the conversation records collection:
//!
//! ```json
//! { "conversationId": "abc", "message": { "content": "hi", "roleTag": "USER" }, "timestamp": "..." }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::message::MessageRole;

/// The role tag stored alongside message content.
///
/// Known roles map to their canonical uppercase names. Any other tag written
/// by some other producer is kept verbatim in `Unrecognized` so that parsing
/// never fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleTag {
    User,
    Assistant,
    System,
    Unrecognized(String),
}

impl RoleTag {
    /// Classify a raw tag. Matching is exact: `"user"` is not `USER`.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "USER" => RoleTag::User,
            "ASSISTANT" => RoleTag::Assistant,
            "SYSTEM" => RoleTag::System,
            other => RoleTag::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleTag::User => "USER",
            RoleTag::Assistant => "ASSISTANT",
            RoleTag::System => "SYSTEM",
            RoleTag::Unrecognized(tag) => tag,
        }
    }

    /// The message role for this tag, or `None` for unrecognized tags.
    pub fn role(&self) -> Option<MessageRole> {
        match self {
            RoleTag::User => Some(MessageRole::User),
            RoleTag::Assistant => Some(MessageRole::Assistant),
            RoleTag::System => Some(MessageRole::System),
            RoleTag::Unrecognized(_) => None,
        }
    }
}

impl From<MessageRole> for RoleTag {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => RoleTag::User,
            MessageRole::Assistant => RoleTag::Assistant,
            MessageRole::System => RoleTag::System,
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The message part of a stored record.
///
/// `role_tag` is kept as the literal string so records written by newer or
/// older producers still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMessage {
    pub content: String,
    pub role_tag: String,
}

impl PersistedMessage {
    pub fn tag(&self) -> RoleTag {
        RoleTag::parse(&self.role_tag)
    }
}

/// One stored message belonging to a conversation.
///
/// Records are immutable once written. `timestamp` is assigned by the store,
/// never by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub message: PersistedMessage,
    pub timestamp: DateTime<Utc>,
}
