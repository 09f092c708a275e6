//! Manager for the user.

use outfitsync_core::{Owner, OwnerKind, Slot};
use outfitsync_store::OutfitStateStore;
use std::sync::Arc;

use crate::{ManagerCore, OutfitManager};

/// The user is a singleton owner; only the instance changes.
pub struct UserOutfitManager {
    core: ManagerCore,
}

impl UserOutfitManager {
    pub fn new(store: Arc<OutfitStateStore>) -> Self {
        Self {
            core: ManagerCore::new(store, &Slot::ALL, Some(Owner::User), "User"),
        }
    }
}

impl OutfitManager for UserOutfitManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    fn kind(&self) -> OwnerKind {
        OwnerKind::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PersonaOutfitManager, SetItemOutcome};
    use outfitsync_core::{InstanceId, OwnerId};

    #[test]
    fn bound_once_instance_is_set() {
        let m = UserOutfitManager::new(Arc::new(OutfitStateStore::new()));
        assert_eq!(m.owner(), Some(Owner::User));
        assert!(!m.is_bound());
        m.set_instance(Some(InstanceId::from("i1")));
        assert!(m.is_bound());
    }

    #[test]
    fn user_and_persona_state_are_separate() {
        let store = Arc::new(OutfitStateStore::new());
        let user = UserOutfitManager::new(Arc::clone(&store));
        user.set_name("Sam");
        user.set_instance(Some(InstanceId::from("i1")));

        let persona = PersonaOutfitManager::new(Arc::clone(&store));
        persona.set_owner(Some(OwnerId::from("p1")));
        persona.set_instance(Some(InstanceId::from("i1")));

        assert_eq!(
            user.set_outfit_item("neck-accessory", "scarf").unwrap(),
            SetItemOutcome::Changed("Sam put on scarf.".into())
        );
        assert_eq!(persona.get_item(Slot::NeckAccessory), "None");
        assert!(store.outfit(&Owner::User, &InstanceId::from("i1")).is_some());
    }

    #[test]
    fn user_presets_keyed_by_instance() {
        let store = Arc::new(OutfitStateStore::new());
        let user = UserOutfitManager::new(Arc::clone(&store));
        user.set_instance(Some(InstanceId::from("i1")));
        user.save_preset("gym").unwrap();

        assert!(store.snapshot().presets.user.contains_key("i1"));

        user.set_instance(Some(InstanceId::from("i2")));
        assert!(user.get_presets().unwrap().is_empty());
    }
}
