//! Outfit managers.
//!
//! An [`OutfitManager`] is a per-owner façade over the
//! [`OutfitStateStore`](outfitsync_store::OutfitStateStore): it knows which
//! owner and which conversation instance it is bound to, validates edits, and
//! describes every transition in a sentence the host can show.
//!
//! Two variants exist, picked at construction:
//! - [`PersonaOutfitManager`]: owner id assigned per character, rebound on
//!   every character switch
//! - [`UserOutfitManager`]: the fixed singleton user owner
//!
//! Managers only write to the in-memory store. Persisting is left to the
//! caller (the pipeline, the session coordinator, the CLI).

pub mod base;
pub mod persona;
pub mod user;

pub use base::{ManagerCore, SetItemOutcome};
pub use persona::PersonaOutfitManager;
pub use user::UserOutfitManager;

use outfitsync_core::{InstanceId, OutfitState, Owner, OwnerKind, Slot};
use outfitsync_store::StoreError;

/// Errors from manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("unknown slot: {0}")]
    UnknownSlot(String),

    #[error("manager is not bound to an owner and instance")]
    Unbound,

    #[error("preset '{0}' already exists")]
    PresetExists(String),

    #[error("preset '{0}' not found")]
    PresetNotFound(String),

    #[error("invalid preset name: {0:?}")]
    InvalidPresetName(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The manager contract shared by the persona and user variants.
///
/// Every operation is provided on top of [`ManagerCore`]; a variant only
/// says which core it owns and which kind of owner it speaks for.
pub trait OutfitManager: Send + Sync {
    fn core(&self) -> &ManagerCore;

    fn kind(&self) -> OwnerKind;

    /// Display name used in transition messages.
    fn name(&self) -> String {
        self.core().name()
    }

    fn set_name(&self, name: &str) {
        self.core().set_name(name);
    }

    /// The bound owner, if any.
    fn owner(&self) -> Option<Owner> {
        self.core().owner()
    }

    fn instance_id(&self) -> Option<InstanceId> {
        self.core().instance_id()
    }

    fn set_instance(&self, instance: Option<InstanceId>) {
        self.core().set_instance(instance);
    }

    fn is_bound(&self) -> bool {
        self.core().bound().is_some()
    }

    fn slots(&self) -> &'static [Slot] {
        self.core().slots()
    }

    fn get_outfit_data(&self) -> OutfitState {
        self.core().outfit()
    }

    fn get_item(&self, slot: Slot) -> String {
        self.core().outfit().value(slot).to_string()
    }

    fn set_outfit_item(&self, slot: &str, value: &str) -> Result<SetItemOutcome, ManagerError> {
        self.core().set_item(slot, value)
    }

    /// Apply interactive input: `None` means the prompt was cancelled, an
    /// empty string removes the item.
    fn change_outfit_item(
        &self,
        slot: &str,
        input: Option<&str>,
    ) -> Result<SetItemOutcome, ManagerError> {
        match input {
            None => {
                self.core().validate_slot(slot)?;
                Ok(SetItemOutcome::Unchanged)
            }
            Some(value) => self.core().set_item(slot, value),
        }
    }

    fn get_presets(&self) -> Result<Vec<String>, ManagerError> {
        self.core().preset_names()
    }

    fn save_preset(&self, name: &str) -> Result<(), ManagerError> {
        self.core().save_preset(name, false)
    }

    fn overwrite_preset(&self, name: &str) -> Result<(), ManagerError> {
        self.core().save_preset(name, true)
    }

    fn delete_preset(&self, name: &str) -> Result<(), ManagerError> {
        self.core().delete_preset(name)
    }

    /// Apply a preset's slots. Returns one message per changed slot.
    fn load_preset(&self, name: &str) -> Result<Vec<String>, ManagerError> {
        self.core().load_preset(name, false)
    }

    /// Apply the default preset, resetting slots it does not mention.
    ///
    /// `Ok(None)` when no default is set.
    fn load_default_outfit(&self) -> Result<Option<Vec<String>>, ManagerError> {
        match self.core().default_preset_name()? {
            Some(name) => self.core().load_preset(&name, true).map(Some),
            None => Ok(None),
        }
    }

    fn set_default_preset(&self, name: &str) -> Result<(), ManagerError> {
        self.core().set_default_preset(name)
    }

    fn clear_default_preset(&self) -> Result<bool, ManagerError> {
        self.core().clear_default_preset()
    }

    fn get_default_preset_name(&self) -> Result<Option<String>, ManagerError> {
        self.core().default_preset_name()
    }

    fn set_prompt_injection(&self, enabled: bool) -> Result<(), ManagerError> {
        self.core().set_prompt_injection(enabled)
    }

    /// Unbound managers report `true`, the store default.
    fn prompt_injection_enabled(&self) -> bool {
        self.core().prompt_injection_enabled()
    }
}
