//! A host backed by a JSON session file.
//!
//! ```json
//! {
//!   "user_name": "Sam",
//!   "active_character": "Ava",
//!   "characters": [{ "name": "Ava", "extensions": {} }],
//!   "messages": [{ "role": "author", "name": "Ava", "content": "Hello!" }]
//! }
//! ```
//!
//! Owner ids assigned to characters are written back into the file.

use async_trait::async_trait;
use outfitsync_core::error::HostError;
use outfitsync_core::{
    CharacterDirectory, CharacterRecord, ChatMessage, ExtensionWriter, HostContext,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default = "default_user_name")]
    pub user_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_character: Option<String>,

    #[serde(default)]
    pub characters: Vec<CharacterRecord>,

    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

fn default_user_name() -> String {
    "User".into()
}

pub struct SessionFile {
    path: PathBuf,
    data: RwLock<SessionData>,
}

impl SessionFile {
    pub async fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read session file {}: {e}", path.display()))?;
        let data: SessionData = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid session file {}: {e}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            data: RwLock::new(data),
        })
    }

    /// Re-read the file, keeping the old contents if it cannot be parsed.
    pub async fn reload(&self) -> bool {
        let Ok(raw) = tokio::fs::read_to_string(&self.path).await else {
            return false;
        };
        match serde_json::from_str::<SessionData>(&raw) {
            Ok(data) => {
                *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unparsable session file");
                false
            }
        }
    }

    pub fn message_count(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .messages
            .len()
    }
}

impl HostContext for SessionFile {
    fn messages(&self) -> Vec<ChatMessage> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .messages
            .clone()
    }

    fn active_character(&self) -> Option<CharacterRecord> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let active = data.active_character.as_deref()?;
        data.characters.iter().find(|c| c.answers_to(active)).cloned()
    }

    fn user_name(&self) -> String {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_name
            .clone()
    }
}

impl CharacterDirectory for SessionFile {
    fn characters(&self) -> Vec<CharacterRecord> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .characters
            .clone()
    }
}

#[async_trait]
impl ExtensionWriter for SessionFile {
    async fn write_field(
        &self,
        character: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), HostError> {
        let write_error = |reason: String| HostError::ExtensionWrite {
            character: character.into(),
            field: field.into(),
            reason,
        };

        let serialized = {
            let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
            let record = data
                .characters
                .iter_mut()
                .find(|c| c.name == character)
                .ok_or_else(|| write_error("no such character".into()))?;
            record.extensions.insert(field.into(), value);
            serde_json::to_string_pretty(&*data).map_err(|e| write_error(e.to_string()))?
        };

        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|e| write_error(e.to_string()))
    }
}
