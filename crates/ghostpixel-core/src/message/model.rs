//! Conversation message types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timestamp::StoreTimestamp;

/// Represents the role of a message in a conversation.
///
/// Replies are stored as `"ai"` on the wire; `"assistant"` is accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageRole {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable entry in a workspace's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub created_at: StoreTimestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        role: MessageRole,
    }

    #[test]
    fn assistant_is_stored_as_ai() {
        let json = serde_json::to_string(&Wrapper {
            role: MessageRole::Assistant,
        })
        .unwrap();
        assert_eq!(json, r#"{"role":"ai"}"#);
    }

    #[test]
    fn assistant_alias_is_accepted() {
        let parsed: Wrapper = serde_json::from_str(r#"{"role":"assistant"}"#).unwrap();
        assert_eq!(parsed.role, MessageRole::Assistant);
    }
}
