//! The host application surface.
//!
//! The core never assumes more than these traits expose: the conversation,
//! character records with an extensible metadata bag, a best-effort writer for
//! that bag, and a sink for user-visible notices.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::HostError;
use crate::message::ChatMessage;
use crate::outfit::OwnerId;

/// Extension field under which a persona's owner id is persisted.
pub const OWNER_ID_FIELD: &str = "outfit_owner_id";

/// A character known to the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Display name
    pub name: String,

    /// Opaque extension metadata owned by the host
    #[serde(default)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

impl CharacterRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: serde_json::Map::new(),
        }
    }

    /// The persisted owner id, if one was assigned.
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.extensions
            .get(OWNER_ID_FIELD)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(OwnerId::from)
    }

    pub fn with_owner_id(mut self, id: &OwnerId) -> Self {
        self.extensions
            .insert(OWNER_ID_FIELD.into(), serde_json::Value::String(id.0.clone()));
        self
    }

    /// Whether `name` refers to this character. Case-insensitive, and macro
    /// spellings with `_` for spaces also match.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.name.eq_ignore_ascii_case(&name.replace('_', " "))
    }
}

/// Name → owner lookup over the host's character list.
pub trait CharacterDirectory: Send + Sync {
    fn characters(&self) -> Vec<CharacterRecord>;

    fn owner_id_for(&self, name: &str) -> Option<OwnerId> {
        self.characters()
            .into_iter()
            .find(|c| c.answers_to(name))
            .and_then(|c| c.owner_id())
    }
}

/// Read access to the host's active conversation.
pub trait HostContext: Send + Sync {
    /// Messages of the active conversation, oldest first.
    fn messages(&self) -> Vec<ChatMessage>;

    /// The character currently being played, if any.
    fn active_character(&self) -> Option<CharacterRecord>;

    /// Display name of the user.
    fn user_name(&self) -> String;
}

/// Best-effort writer into a character's extension metadata.
#[async_trait]
pub trait ExtensionWriter: Send + Sync {
    async fn write_field(
        &self,
        character: &str,
        field: &str,
        value: serde_json::Value,
    ) -> std::result::Result<(), HostError>;
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible notification (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Sink for user-visible notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// A notifier that writes notices to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => info!(notice = %notice.message),
            NoticeLevel::Warning => warn!(notice = %notice.message),
            NoticeLevel::Error => error!(notice = %notice.message),
        }
    }
}
