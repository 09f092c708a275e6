//! No-op backend. Disables persistence entirely.

use async_trait::async_trait;
use outfitsync_core::error::StorageError;
use outfitsync_core::persistence::{StateBackend, StateDocument};

pub struct NoopBackend;

#[async_trait]
impl StateBackend for NoopBackend {
    fn name(&self) -> &str {
        "none"
    }

    async fn load(&self) -> Result<Option<StateDocument>, StorageError> {
        Ok(None)
    }

    async fn save(&self, _document: &StateDocument) -> Result<(), StorageError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
