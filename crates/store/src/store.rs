//! The outfit state store.
//!
//! All reads hand out deep copies; all writes go through methods that replace
//! whole values under a short write lock and then notify listeners after the
//! lock is released. No lock is ever held across an `.await`.

use outfitsync_core::persistence::{InstanceRecord, StateBackend, StateDocument};
use outfitsync_core::{InstanceId, OutfitState, Owner, Slot};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::StoreError;

/// A change that just happened in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// First write for a new (owner, instance) pair
    InstanceCreated { owner: Owner, instance: InstanceId },
    /// Outfit of an existing pair replaced
    OutfitUpdated { owner: Owner, instance: InstanceId },
    /// Prompt-injection flag changed
    InjectionToggled {
        owner: Owner,
        instance: InstanceId,
        enabled: bool,
    },
    InstanceRemoved { owner: Owner, instance: InstanceId },
    PresetSaved {
        owner: Owner,
        instance: InstanceId,
        name: String,
    },
    PresetDeleted {
        owner: Owner,
        instance: InstanceId,
        name: String,
    },
    DefaultPresetChanged {
        owner: Owner,
        instance: InstanceId,
        name: Option<String>,
    },
    SettingChanged { key: String },
    /// The whole document was replaced from the backend
    Loaded,
}

/// Error a listener may report. Logged, never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// A change listener.
pub type Listener = Arc<dyn Fn(&StoreEvent) -> Result<(), ListenerError> + Send + Sync>;

/// Handle returned by [`OutfitStateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Where a scope's presets and default pointer live.
enum Scope {
    Persona(String),
    User(String),
}

fn scope_for(owner: &Owner, instance: &InstanceId) -> Result<Scope, StoreError> {
    if instance.as_str().is_empty() {
        return Err(StoreError::MissingScopeOperand("instance id"));
    }
    match owner {
        Owner::Persona(id) if id.as_str().is_empty() => {
            Err(StoreError::MissingScopeOperand("owner id"))
        }
        Owner::Persona(id) => Ok(Scope::Persona(format!("{}_{}", id, instance))),
        Owner::User => Ok(Scope::User(instance.0.clone())),
    }
}

/// The single source of truth for outfit state.
pub struct OutfitStateStore {
    state: RwLock<StateDocument>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
    backend: Option<Arc<dyn StateBackend>>,
}

impl OutfitStateStore {
    /// A purely in-memory store. Saves are no-ops.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StateDocument::default()),
            listeners: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            backend: None,
        }
    }

    /// Attach a persistence backend.
    pub fn with_backend(mut self, backend: Arc<dyn StateBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, StateDocument> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateDocument> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the write lock, then deliver the events it produced.
    fn mutate<T>(&self, f: impl FnOnce(&mut StateDocument) -> (T, Vec<StoreEvent>)) -> T {
        let (result, events) = {
            let mut doc = self.write();
            f(&mut doc)
        };
        for event in &events {
            self.notify(event);
        }
        result
    }

    // ── Subscriptions ──────────────────────────────────────────────────

    /// Register a listener invoked synchronously after every mutation.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() < before
    }

    fn notify(&self, event: &StoreEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            if let Err(e) = listener(event) {
                warn!(error = %e, ?event, "Store listener failed");
            }
        }
    }

    // ── Outfit state ───────────────────────────────────────────────────

    fn record_ref<'a>(
        doc: &'a StateDocument,
        owner: &Owner,
        instance: &InstanceId,
    ) -> Option<&'a InstanceRecord> {
        match owner {
            Owner::Persona(id) => doc.persona_instances.get(id)?.get(instance),
            Owner::User => doc.user_instances.get(instance),
        }
    }

    /// A copy of one owner's outfit in one instance.
    pub fn outfit(&self, owner: &Owner, instance: &InstanceId) -> Option<OutfitState> {
        Self::record_ref(&self.read(), owner, instance).map(|r| r.slots.clone())
    }

    /// A copy of the full record, including the injection flag.
    pub fn record(&self, owner: &Owner, instance: &InstanceId) -> Option<InstanceRecord> {
        Self::record_ref(&self.read(), owner, instance).cloned()
    }

    /// Replace an outfit, keeping any existing prompt-injection flag.
    pub fn set_outfit(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        slots: OutfitState,
    ) -> Result<(), StoreError> {
        self.write_record(owner, instance, slots, None)
    }

    /// Replace an outfit and its prompt-injection flag together.
    pub fn set_outfit_with_injection(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        slots: OutfitState,
        enabled: bool,
    ) -> Result<(), StoreError> {
        self.write_record(owner, instance, slots, Some(enabled))
    }

    fn write_record(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        slots: OutfitState,
        injection: Option<bool>,
    ) -> Result<(), StoreError> {
        scope_for(owner, instance)?;

        self.mutate(|doc| {
            let map = instances_mut(doc, owner);
            let event = match map.get_mut(instance) {
                Some(existing) => {
                    existing.slots = slots;
                    if let Some(enabled) = injection {
                        existing.prompt_injection_enabled = enabled;
                    }
                    StoreEvent::OutfitUpdated {
                        owner: owner.clone(),
                        instance: instance.clone(),
                    }
                }
                None => {
                    let mut record = InstanceRecord::new(slots);
                    if let Some(enabled) = injection {
                        record.prompt_injection_enabled = enabled;
                    }
                    map.insert(instance.clone(), record);
                    info!(%owner, %instance, "Created outfit instance");
                    StoreEvent::InstanceCreated {
                        owner: owner.clone(),
                        instance: instance.clone(),
                    }
                }
            };
            ((), vec![event])
        });
        Ok(())
    }

    /// Whether macros may render this outfit. Defaults to `true`.
    pub fn prompt_injection_enabled(&self, owner: &Owner, instance: &InstanceId) -> bool {
        Self::record_ref(&self.read(), owner, instance)
            .is_none_or(|r| r.prompt_injection_enabled)
    }

    /// Set the prompt-injection flag, creating an empty record if needed.
    pub fn set_prompt_injection_enabled(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        enabled: bool,
    ) -> Result<(), StoreError> {
        scope_for(owner, instance)?;

        self.mutate(|doc| {
            let map = instances_mut(doc, owner);
            let mut events = Vec::new();
            match map.get_mut(instance) {
                Some(record) => {
                    if record.prompt_injection_enabled == enabled {
                        return ((), events);
                    }
                    record.prompt_injection_enabled = enabled;
                }
                None => {
                    let mut record = InstanceRecord::new(OutfitState::empty(&Slot::ALL));
                    record.prompt_injection_enabled = enabled;
                    map.insert(instance.clone(), record);
                    events.push(StoreEvent::InstanceCreated {
                        owner: owner.clone(),
                        instance: instance.clone(),
                    });
                }
            }
            events.push(StoreEvent::InjectionToggled {
                owner: owner.clone(),
                instance: instance.clone(),
                enabled,
            });
            ((), events)
        });
        Ok(())
    }

    /// Delete one instance. An owner whose last instance goes is pruned.
    pub fn remove_instance(&self, owner: &Owner, instance: &InstanceId) -> bool {
        self.mutate(|doc| {
            let removed = match owner {
                Owner::Persona(id) => {
                    let Some(map) = doc.persona_instances.get_mut(id) else {
                        return (false, vec![]);
                    };
                    let removed = map.remove(instance).is_some();
                    if map.is_empty() {
                        doc.persona_instances.remove(id);
                        debug!(owner = %id, "Pruned owner with no instances");
                    }
                    removed
                }
                Owner::User => doc.user_instances.remove(instance).is_some(),
            };
            if !removed {
                return (false, vec![]);
            }
            (
                true,
                vec![StoreEvent::InstanceRemoved {
                    owner: owner.clone(),
                    instance: instance.clone(),
                }],
            )
        })
    }

    /// Instance ids with stored state for an owner.
    pub fn instances(&self, owner: &Owner) -> Vec<InstanceId> {
        let doc = self.read();
        match owner {
            Owner::Persona(id) => doc
                .persona_instances
                .get(id)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default(),
            Owner::User => doc.user_instances.keys().cloned().collect(),
        }
    }

    // ── Presets ────────────────────────────────────────────────────────

    /// All presets for a scope, by name.
    pub fn presets(
        &self,
        owner: &Owner,
        instance: &InstanceId,
    ) -> Result<BTreeMap<String, OutfitState>, StoreError> {
        let scope = scope_for(owner, instance)?;
        let doc = self.read();
        let book = match &scope {
            Scope::Persona(key) => doc.presets.persona.get(key),
            Scope::User(key) => doc.presets.user.get(key),
        };
        Ok(book.cloned().unwrap_or_default())
    }

    /// One preset by name.
    pub fn preset(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        name: &str,
    ) -> Result<Option<OutfitState>, StoreError> {
        Ok(self.presets(owner, instance)?.remove(name))
    }

    /// Insert or replace a preset. Returns whether one was replaced.
    pub fn save_preset(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        name: &str,
        slots: OutfitState,
    ) -> Result<bool, StoreError> {
        let scope = scope_for(owner, instance)?;
        Ok(self.mutate(|doc| {
            let book = match scope {
                Scope::Persona(key) => doc.presets.persona.entry(key).or_default(),
                Scope::User(key) => doc.presets.user.entry(key).or_default(),
            };
            let replaced = book.insert(name.to_string(), slots).is_some();
            (
                replaced,
                vec![StoreEvent::PresetSaved {
                    owner: owner.clone(),
                    instance: instance.clone(),
                    name: name.to_string(),
                }],
            )
        }))
    }

    /// Delete a preset. Default-preset pointers naming it are left alone.
    pub fn delete_preset(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        name: &str,
    ) -> Result<bool, StoreError> {
        let scope = scope_for(owner, instance)?;
        Ok(self.mutate(|doc| {
            let (key, books) = match scope {
                Scope::Persona(key) => (key, &mut doc.presets.persona),
                Scope::User(key) => (key, &mut doc.presets.user),
            };
            let Some(book) = books.get_mut(&key) else {
                return (false, vec![]);
            };
            if book.remove(name).is_none() {
                return (false, vec![]);
            }
            if book.is_empty() {
                books.remove(&key);
            }
            (
                true,
                vec![StoreEvent::PresetDeleted {
                    owner: owner.clone(),
                    instance: instance.clone(),
                    name: name.to_string(),
                }],
            )
        }))
    }

    /// The default-preset pointer for a scope.
    pub fn default_preset(
        &self,
        owner: &Owner,
        instance: &InstanceId,
    ) -> Result<Option<String>, StoreError> {
        let scope = scope_for(owner, instance)?;
        let doc = self.read();
        let defaults = &doc.settings.default_presets;
        Ok(match scope {
            Scope::Persona(key) => defaults.persona.get(&key).cloned(),
            Scope::User(key) => defaults.user.get(&key).cloned(),
        })
    }

    /// Point a scope's default at a preset name. Only the name is stored.
    pub fn set_default_preset(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        name: &str,
    ) -> Result<(), StoreError> {
        self.update_default_preset(owner, instance, Some(name.to_string()))
            .map(|_| ())
    }

    /// Remove a scope's default pointer. Returns whether one was set.
    pub fn clear_default_preset(
        &self,
        owner: &Owner,
        instance: &InstanceId,
    ) -> Result<bool, StoreError> {
        self.update_default_preset(owner, instance, None)
            .map(|previous| previous.is_some())
    }

    fn update_default_preset(
        &self,
        owner: &Owner,
        instance: &InstanceId,
        name: Option<String>,
    ) -> Result<Option<String>, StoreError> {
        let scope = scope_for(owner, instance)?;
        Ok(self.mutate(|doc| {
            let defaults = &mut doc.settings.default_presets;
            let (key, map) = match scope {
                Scope::Persona(key) => (key, &mut defaults.persona),
                Scope::User(key) => (key, &mut defaults.user),
            };
            let previous = match &name {
                Some(n) => map.insert(key, n.clone()),
                None => map.remove(&key),
            };
            if previous.is_none() && name.is_none() {
                return (None, vec![]);
            }
            (
                previous,
                vec![StoreEvent::DefaultPresetChanged {
                    owner: owner.clone(),
                    instance: instance.clone(),
                    name,
                }],
            )
        }))
    }

    // ── Settings ───────────────────────────────────────────────────────

    /// A copy of a free-form setting.
    pub fn setting(&self, key: &str) -> Option<serde_json::Value> {
        self.read().settings.values.get(key).cloned()
    }

    /// Set a free-form setting.
    pub fn set_setting(&self, key: &str, value: serde_json::Value) {
        self.mutate(|doc| {
            doc.settings.values.insert(key.to_string(), value);
            (
                (),
                vec![StoreEvent::SettingChanged {
                    key: key.to_string(),
                }],
            )
        })
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// A deep copy of the whole document.
    pub fn snapshot(&self) -> StateDocument {
        self.read().clone()
    }

    /// Replace in-memory state with the backend's document.
    ///
    /// Returns whether anything was loaded.
    pub async fn load(&self) -> Result<bool, StoreError> {
        let Some(backend) = &self.backend else {
            debug!("No storage backend, starting empty");
            return Ok(false);
        };
        let Some(document) = backend.load().await? else {
            return Ok(false);
        };
        info!(
            backend = backend.name(),
            personas = document.persona_instances.len(),
            user_instances = document.user_instances.len(),
            "Loaded outfit state"
        );
        self.mutate(|doc| {
            *doc = document;
            ((), vec![StoreEvent::Loaded])
        });
        Ok(true)
    }

    /// Hand a snapshot to the backend.
    pub async fn save(&self) -> Result<(), StoreError> {
        let Some(backend) = &self.backend else {
            warn!("No storage backend configured, outfit state not saved");
            return Ok(());
        };
        let snapshot = self.snapshot();
        backend.save(&snapshot).await?;
        Ok(())
    }

    /// Make previously saved state durable.
    pub async fn flush(&self) -> Result<(), StoreError> {
        match &self.backend {
            Some(backend) => Ok(backend.flush().await?),
            None => Ok(()),
        }
    }

    /// `save` followed by `flush`.
    pub async fn persist(&self) -> Result<(), StoreError> {
        self.save().await?;
        self.flush().await
    }
}

impl Default for OutfitStateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn instances_mut<'a>(
    doc: &'a mut StateDocument,
    owner: &Owner,
) -> &'a mut BTreeMap<InstanceId, InstanceRecord> {
    match owner {
        Owner::Persona(id) => doc.persona_instances.entry(id.clone()).or_default(),
        Owner::User => &mut doc.user_instances,
    }
}
