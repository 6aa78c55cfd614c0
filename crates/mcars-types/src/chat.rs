//! Conversation message and stream fragment types.
//!
//! A [`ChatMessage`] is one bubble in the widget transcript. A [`Fragment`]
//! is one incremental piece of an assistant reply as it streams in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

/// A single message shown in the conversation view.
///
/// Messages are append-only. The one exception is the most recent
/// assistant message, whose text grows while its reply is streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A user-authored message stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// An assistant message stamped with the current time.
    ///
    /// Pass an empty string for a reply placeholder that is still waiting
    /// on its first fragment.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// One incremental text piece of a streamed reply.
///
/// Fragments may carry an empty string; appending one is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
