//! In-memory backend, useful for testing and ephemeral sessions.
//!
//! Keeps the staged and committed documents apart so tests can observe
//! the difference between `save` and `flush`.

use async_trait::async_trait;
use outfitsync_core::error::StorageError;
use outfitsync_core::persistence::{StateBackend, StateDocument};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryBackend {
    staged: RwLock<Option<StateDocument>>,
    committed: RwLock<Option<StateDocument>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-committed document.
    pub fn with_document(document: StateDocument) -> Self {
        Self {
            staged: RwLock::new(None),
            committed: RwLock::new(Some(document)),
        }
    }

    /// What a fresh process would load right now.
    pub async fn committed(&self) -> Option<StateDocument> {
        self.committed.read().await.clone()
    }

    pub async fn has_pending(&self) -> bool {
        self.staged.read().await.is_some()
    }
}

#[async_trait]
impl StateBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self) -> Result<Option<StateDocument>, StorageError> {
        Ok(self.committed.read().await.clone())
    }

    async fn save(&self, document: &StateDocument) -> Result<(), StorageError> {
        *self.staged.write().await = Some(document.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        if let Some(doc) = self.staged.write().await.take() {
            *self.committed.write().await = Some(doc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flush_commits_staged_document() {
        let backend = InMemoryBackend::new();
        assert!(backend.load().await.unwrap().is_none());

        backend.save(&StateDocument::default()).await.unwrap();
        assert!(backend.has_pending().await);
        assert!(backend.load().await.unwrap().is_none());

        backend.flush().await.unwrap();
        assert!(!backend.has_pending().await);
        assert_eq!(backend.load().await.unwrap(), Some(StateDocument::default()));
    }

    #[tokio::test]
    async fn with_document_is_loadable() {
        let backend = InMemoryBackend::with_document(StateDocument::default());
        assert!(backend.committed().await.is_some());
    }
}
