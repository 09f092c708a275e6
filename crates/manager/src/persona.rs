//! Manager for the active persona.

use outfitsync_core::{Owner, OwnerId, OwnerKind, Slot};
use outfitsync_store::OutfitStateStore;
use std::sync::Arc;

use crate::{ManagerCore, OutfitManager};

/// Speaks for whichever character is active. Starts with no owner; the
/// session binds one whenever the character changes.
pub struct PersonaOutfitManager {
    core: ManagerCore,
}

impl PersonaOutfitManager {
    pub fn new(store: Arc<OutfitStateStore>) -> Self {
        Self {
            core: ManagerCore::new(store, &Slot::ALL, None, "Character"),
        }
    }

    /// Bind (or unbind) the character this manager speaks for.
    pub fn set_owner(&self, owner_id: Option<OwnerId>) {
        self.core
            .set_owner(owner_id.filter(|id| !id.as_str().is_empty()).map(Owner::Persona));
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        match self.core.owner() {
            Some(Owner::Persona(id)) => Some(id),
            _ => None,
        }
    }
}

impl OutfitManager for PersonaOutfitManager {
    fn core(&self) -> &ManagerCore {
        &self.core
    }

    fn kind(&self) -> OwnerKind {
        OwnerKind::Persona
    }
}
