//! # outfitsync core
//!
//! Domain types, traits, and error definitions for the outfit state tracker.
//! It defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (the host application, the language model, the
//! persistence layer) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod slot;
pub mod outfit;
pub mod message;
pub mod host;
pub mod provider;
pub mod persistence;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{HostError, ProviderError, StorageError};
pub use slot::Slot;
pub use outfit::{InstanceId, OutfitState, Owner, OwnerId, OwnerKind, NONE_VALUE, MAX_VALUE_LEN};
pub use message::{ChatMessage, Role};
pub use host::{CharacterDirectory, CharacterRecord, ExtensionWriter, HostContext, Notice, NoticeLevel, Notifier};
pub use provider::{Provider, ProviderRequest};
pub use persistence::{InstanceRecord, StateBackend, StateDocument};
pub use event::{EventBus, HostEvent};
