//! File backend: the whole state document as one JSON file.
//!
//! `save` serializes into a staging buffer; `flush` writes the buffer to a
//! sibling temp file and renames it over the target, so a crash mid-write
//! leaves the previous document intact.

use async_trait::async_trait;
use outfitsync_core::error::StorageError;
use outfitsync_core::persistence::{StateBackend, StateDocument};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct FileBackend {
    path: PathBuf,
    staged: Mutex<Option<String>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<Option<StateDocument>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file yet");
                return Ok(None);
            }
            Err(e) => {
                return Err(StorageError::Io(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            warn!(path = %self.path.display(), "State file is empty, ignoring");
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    async fn save(&self, document: &StateDocument) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        *self.staged.lock().await = Some(json);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        let mut staged = self.staged.lock().await;
        let Some(json) = staged.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::Io(format!("Failed to create state directory: {e}"))
            })?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StorageError::Io(format!("Failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), bytes = json.len(), "Flushed outfit state");
        *staged = None;
        Ok(())
    }
}
