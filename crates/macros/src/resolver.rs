//! Macro resolution against the outfit managers.

use outfitsync_core::{CharacterDirectory, InstanceId, OwnerId, Slot, NONE_VALUE};
use outfitsync_core::{Owner, OutfitState};
use outfitsync_manager::{OutfitManager, PersonaOutfitManager, UserOutfitManager};
use outfitsync_store::{OutfitStateStore, SubscriptionId};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::TtlCache;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    macro_type: String,
    slot: String,
    override_name: Option<String>,
    owner: Option<OwnerId>,
    instance: Option<InstanceId>,
}

/// Renders `{{<type>_<slot>}}` tokens from current outfit state.
///
/// Managers are attached after construction; until then every lookup
/// degrades to `"None"`.
pub struct MacroResolver {
    directory: Arc<dyn CharacterDirectory>,
    persona: RwLock<Option<Arc<PersonaOutfitManager>>>,
    user: RwLock<Option<Arc<UserOutfitManager>>>,
    cache: Arc<TtlCache<CacheKey, String>>,
}

impl MacroResolver {
    pub fn new(directory: Arc<dyn CharacterDirectory>, ttl: Duration) -> Self {
        Self {
            directory,
            persona: RwLock::new(None),
            user: RwLock::new(None),
            cache: Arc::new(TtlCache::new(ttl)),
        }
    }

    pub fn set_persona_manager(&self, manager: Arc<PersonaOutfitManager>) {
        *self.persona.write().unwrap_or_else(PoisonError::into_inner) = Some(manager);
        self.invalidate_cache();
    }

    pub fn set_user_manager(&self, manager: Arc<UserOutfitManager>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(manager);
        self.invalidate_cache();
    }

    fn persona(&self) -> Option<Arc<PersonaOutfitManager>> {
        self.persona
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn user(&self) -> Option<Arc<UserOutfitManager>> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Clear the whole cache on every store mutation.
    pub fn attach(&self, store: &OutfitStateStore) -> SubscriptionId {
        let cache = Arc::clone(&self.cache);
        store.subscribe(move |_event| {
            cache.invalidate_all();
            Ok(())
        })
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Resolve one macro to a slot value, `"None"` when it cannot be resolved.
    pub fn resolve(&self, macro_type: &str, slot: &str, override_name: Option<&str>) -> String {
        let persona = self.persona();
        let key = CacheKey {
            macro_type: macro_type.to_string(),
            slot: slot.to_string(),
            override_name: override_name.map(str::to_string),
            owner: persona.as_ref().and_then(|p| p.owner_id()),
            instance: self.current_instance(),
        };

        self.cache.get_or_compute(key, || {
            let value = self
                .lookup(macro_type, slot, override_name)
                .unwrap_or_else(|| NONE_VALUE.to_string());
            debug!(macro_type, slot, override_name, %value, "Macro resolved");
            value
        })
    }

    fn current_instance(&self) -> Option<InstanceId> {
        self.persona()
            .and_then(|p| p.instance_id())
            .or_else(|| self.user().and_then(|u| u.instance_id()))
    }

    fn lookup(&self, macro_type: &str, slot: &str, override_name: Option<&str>) -> Option<String> {
        let slot: Slot = slot.parse().ok()?;

        match (macro_type, override_name) {
            ("char" | "bot", None) => Self::from_manager(self.persona()?.as_ref(), slot),
            ("char" | "bot", Some(name)) => self.by_character_name(name, slot),
            ("user", _) => Self::from_manager(self.user()?.as_ref(), slot),
            (name, _) => self.by_character_name(name, slot),
        }
    }

    fn from_manager(manager: &dyn OutfitManager, slot: Slot) -> Option<String> {
        if !manager.is_bound() || !manager.prompt_injection_enabled() {
            return None;
        }
        manager
            .slots()
            .contains(&slot)
            .then(|| manager.get_item(slot))
    }

    /// Look up another character's outfit in the current instance.
    fn by_character_name(&self, name: &str, slot: Slot) -> Option<String> {
        let persona = self.persona()?;
        let instance = persona.instance_id()?;
        let owner = Owner::Persona(self.directory.owner_id_for(name)?);

        let store = persona.core().store();
        if !store.prompt_injection_enabled(&owner, &instance) {
            return None;
        }
        let state: OutfitState = store.outfit(&owner, &instance)?;
        Some(state.value(slot).to_string())
    }

    /// Replace every `{{<type>_<slot>}}` token in `text`.
    pub fn substitute_all(&self, text: &str) -> String {
        let mut tokens = Vec::new();
        let mut offset = 0;
        while let Some(open) = text[offset..].find("{{") {
            let start = offset + open;
            let Some(close) = text[start + 2..].find("}}") else {
                break;
            };
            let end = start + 2 + close + 2;
            tokens.push((start, end));
            offset = end;
        }

        let mut out = text.to_string();
        for (start, end) in tokens.into_iter().rev() {
            let inner = &text[start + 2..end - 2];
            let Some((macro_type, slot)) = Slot::split_suffix(inner.trim()) else {
                continue;
            };
            let value = self.resolve(macro_type, slot.as_str(), None);
            out.replace_range(start..end, &value);
        }
        out
    }
}
