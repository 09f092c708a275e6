//! State and behavior shared by both manager variants.

use outfitsync_core::outfit::is_none_value;
use outfitsync_core::{InstanceId, OutfitState, Owner, Slot};
use outfitsync_store::OutfitStateStore;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::ManagerError;

/// Result of a single-slot edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetItemOutcome {
    /// The slot changed; carries the transition message.
    Changed(String),
    /// The slot already held that value.
    Unchanged,
    /// No owner or instance is bound; nothing was written.
    Unbound,
}

impl SetItemOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            SetItemOutcome::Changed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, SetItemOutcome::Changed(_))
    }
}

#[derive(Debug, Clone, Default)]
struct Binding {
    name: String,
    owner: Option<Owner>,
    instance: Option<InstanceId>,
}

/// Binding plus store access. Held by each manager variant.
pub struct ManagerCore {
    store: Arc<OutfitStateStore>,
    slots: &'static [Slot],
    binding: RwLock<Binding>,
}

impl ManagerCore {
    pub fn new(
        store: Arc<OutfitStateStore>,
        slots: &'static [Slot],
        owner: Option<Owner>,
        name: &str,
    ) -> Self {
        Self {
            store,
            slots,
            binding: RwLock::new(Binding {
                name: name.to_string(),
                owner,
                instance: None,
            }),
        }
    }

    pub fn store(&self) -> &Arc<OutfitStateStore> {
        &self.store
    }

    pub fn slots(&self) -> &'static [Slot] {
        self.slots
    }

    fn binding(&self) -> Binding {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut Binding)) {
        f(&mut self.binding.write().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn name(&self) -> String {
        self.binding().name
    }

    pub fn set_name(&self, name: &str) {
        self.update(|b| b.name = name.to_string());
    }

    pub fn owner(&self) -> Option<Owner> {
        self.binding().owner
    }

    pub fn set_owner(&self, owner: Option<Owner>) {
        self.update(|b| b.owner = owner);
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.binding().instance
    }

    pub fn set_instance(&self, instance: Option<InstanceId>) {
        self.update(|b| b.instance = instance);
    }

    /// The (owner, instance) pair when both are set.
    pub fn bound(&self) -> Option<(Owner, InstanceId)> {
        let b = self.binding();
        Some((b.owner?, b.instance?))
    }

    fn require_bound(&self, operation: &str) -> Result<(Owner, InstanceId), ManagerError> {
        self.bound().ok_or_else(|| {
            warn!(operation, name = %self.name(), "Outfit operation refused, manager is not bound");
            ManagerError::Unbound
        })
    }

    /// Parse a slot name and check it belongs to this manager.
    pub fn validate_slot(&self, raw: &str) -> Result<Slot, ManagerError> {
        raw.trim()
            .parse::<Slot>()
            .ok()
            .filter(|slot| self.slots.contains(slot))
            .ok_or_else(|| ManagerError::UnknownSlot(raw.to_string()))
    }

    /// The current outfit, complete over this manager's slots.
    ///
    /// Unbound managers and instances with no record read as all `"None"`.
    pub fn outfit(&self) -> OutfitState {
        let mut state = OutfitState::empty(self.slots);
        if let Some((owner, instance)) = self.bound() {
            if let Some(stored) = self.store.outfit(&owner, &instance) {
                for slot in self.slots {
                    state.set(*slot, stored.value(*slot));
                }
            }
        }
        state
    }

    fn transition(&self, slot: Slot, previous: &str, next: &str) -> String {
        let name = self.name();
        let message = if is_none_value(previous) {
            format!("{name} put on {next}.")
        } else if is_none_value(next) {
            format!("{name} removed {previous}.")
        } else {
            format!("{name} changed from {previous} to {next}.")
        };
        debug!(%slot, %message, "Outfit transition");
        message
    }

    pub fn set_item(&self, raw_slot: &str, value: &str) -> Result<SetItemOutcome, ManagerError> {
        let slot = self.validate_slot(raw_slot)?;
        let Some((owner, instance)) = self.bound() else {
            warn!(%slot, name = %self.name(), "Outfit write ignored, manager is not bound");
            return Ok(SetItemOutcome::Unbound);
        };

        let mut state = self.outfit();
        let previous = state.value(slot).to_string();
        let next = state.set(slot, value).to_string();
        if previous == next {
            return Ok(SetItemOutcome::Unchanged);
        }

        self.store.set_outfit(&owner, &instance, state)?;
        let message = self.transition(slot, &previous, &next);
        info!(%owner, %instance, %slot, value = %next, "Outfit item set");
        Ok(SetItemOutcome::Changed(message))
    }

    // ── Presets ────────────────────────────────────────────────────────

    fn preset_name(name: &str) -> Result<&str, ManagerError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
            return Err(ManagerError::InvalidPresetName(name.to_string()));
        }
        Ok(trimmed)
    }

    pub fn preset_names(&self) -> Result<Vec<String>, ManagerError> {
        let (owner, instance) = self.require_bound("preset_names")?;
        Ok(self.store.presets(&owner, &instance)?.into_keys().collect())
    }

    /// Snapshot the current outfit under `name`.
    pub fn save_preset(&self, name: &str, overwrite: bool) -> Result<(), ManagerError> {
        let name = Self::preset_name(name)?;
        let (owner, instance) = self.require_bound("save_preset")?;

        let exists = self.store.preset(&owner, &instance, name)?.is_some();
        match (exists, overwrite) {
            (true, false) => return Err(ManagerError::PresetExists(name.to_string())),
            (false, true) => return Err(ManagerError::PresetNotFound(name.to_string())),
            _ => {}
        }

        self.store
            .save_preset(&owner, &instance, name, self.outfit())?;
        info!(%owner, %instance, preset = name, overwrite, "Preset saved");
        Ok(())
    }

    pub fn delete_preset(&self, name: &str) -> Result<(), ManagerError> {
        let name = Self::preset_name(name)?;
        let (owner, instance) = self.require_bound("delete_preset")?;
        if !self.store.delete_preset(&owner, &instance, name)? {
            return Err(ManagerError::PresetNotFound(name.to_string()));
        }
        info!(%owner, %instance, preset = name, "Preset deleted");
        Ok(())
    }

    /// Apply a preset. With `reset_missing`, slots the preset does not
    /// mention are cleared to `"None"`.
    pub fn load_preset(&self, name: &str, reset_missing: bool) -> Result<Vec<String>, ManagerError> {
        let name = Self::preset_name(name)?;
        let (owner, instance) = self.require_bound("load_preset")?;
        let preset = self
            .store
            .preset(&owner, &instance, name)?
            .ok_or_else(|| ManagerError::PresetNotFound(name.to_string()))?;

        let mut state = self.outfit();
        let mut messages = Vec::new();
        for slot in self.slots {
            let target = match preset.get(*slot) {
                Some(value) => value,
                None if reset_missing => outfitsync_core::NONE_VALUE,
                None => continue,
            };
            let previous = state.value(*slot).to_string();
            let next = state.set(*slot, target).to_string();
            if previous != next {
                messages.push(self.transition(*slot, &previous, &next));
            }
        }

        if !messages.is_empty() {
            self.store.set_outfit(&owner, &instance, state)?;
        }
        info!(%owner, %instance, preset = name, changed = messages.len(), "Preset loaded");
        Ok(messages)
    }

    // ── Default preset ─────────────────────────────────────────────────

    pub fn set_default_preset(&self, name: &str) -> Result<(), ManagerError> {
        let name = Self::preset_name(name)?;
        let (owner, instance) = self.require_bound("set_default_preset")?;
        if self.store.preset(&owner, &instance, name)?.is_none() {
            return Err(ManagerError::PresetNotFound(name.to_string()));
        }
        self.store.set_default_preset(&owner, &instance, name)?;
        Ok(())
    }

    pub fn clear_default_preset(&self) -> Result<bool, ManagerError> {
        let (owner, instance) = self.require_bound("clear_default_preset")?;
        Ok(self.store.clear_default_preset(&owner, &instance)?)
    }

    /// The default pointer as stored; it may name a preset that no longer exists.
    pub fn default_preset_name(&self) -> Result<Option<String>, ManagerError> {
        let (owner, instance) = self.require_bound("default_preset_name")?;
        Ok(self.store.default_preset(&owner, &instance)?)
    }

    // ── Prompt injection ───────────────────────────────────────────────

    pub fn set_prompt_injection(&self, enabled: bool) -> Result<(), ManagerError> {
        let (owner, instance) = self.require_bound("set_prompt_injection")?;
        self.store
            .set_prompt_injection_enabled(&owner, &instance, enabled)?;
        Ok(())
    }

    pub fn prompt_injection_enabled(&self) -> bool {
        match self.bound() {
            Some((owner, instance)) => self.store.prompt_injection_enabled(&owner, &instance),
            None => true,
        }
    }
}
