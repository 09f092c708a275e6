//! Conversation message types.
//!
//! These are the value objects the host hands us: an ordered list of messages,
//! each tagged with who wrote it. The pipeline reads the most recent ones; the
//! instance id is derived from the first one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human user
    User,
    /// Host-authored system text (narration, notices)
    System,
    /// The persona (the character the model is playing)
    Author,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent this message
    pub role: Role,

    /// Display name of the sender
    pub name: String,

    /// The text content
    pub content: String,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new user message.
    pub fn user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            name: name.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new persona-authored message.
    pub fn author(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Author,
            name: name.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            name: "System".into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// Render the last `window` non-system messages as `Name: text` lines.
pub fn transcript(messages: &[ChatMessage], window: usize) -> String {
    let recent: Vec<&ChatMessage> = messages
        .iter()
        .filter(|m| !m.is_system())
        .rev()
        .take(window)
        .collect();

    recent
        .into_iter()
        .rev()
        .map(|m| format!("{}: {}", m.name, m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
