//! Outfit state store and persistence backends.
//!
//! [`OutfitStateStore`] is the single source of truth for every owner's outfit
//! in every conversation instance, plus presets and settings. It is
//! constructed once and shared by reference; nothing global.

pub mod noop;
pub mod in_memory;
pub mod file_backend;
pub mod instance;
pub mod store;

pub use noop::NoopBackend;
pub use in_memory::InMemoryBackend;
pub use file_backend::FileBackend;
pub use instance::{derive_instance_id, instance_id_for_text};
pub use store::{Listener, ListenerError, OutfitStateStore, StoreEvent, SubscriptionId};

use outfitsync_core::error::StorageError;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A scope key was requested with an empty operand.
    #[error("missing {0} for outfit scope")]
    MissingScopeOperand(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
