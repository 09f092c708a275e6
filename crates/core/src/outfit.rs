//! Outfit state value objects: owners, instances, and slot maps.

use crate::slot::Slot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The literal stored for an unset slot. A slot value is never absent.
pub const NONE_VALUE: &str = "None";

/// Maximum length of a slot value, in characters. Longer values are truncated.
pub const MAX_VALUE_LEN: usize = 1000;

/// Stable identifier of a persona, persisted alongside the character data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic identifier for one conversation branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two entities wears an outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Persona,
    User,
}

/// A concrete owner: a specific persona, or the singleton user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    Persona(OwnerId),
    User,
}

impl Owner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            Owner::Persona(_) => OwnerKind::Persona,
            Owner::User => OwnerKind::User,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Persona(id) => write!(f, "persona:{id}"),
            Owner::User => f.write_str("user"),
        }
    }
}

/// Normalize raw input into a storable slot value.
///
/// `None`, empty, and whitespace-only input become [`NONE_VALUE`]; anything
/// longer than [`MAX_VALUE_LEN`] characters is cut on a char boundary.
pub fn normalize_value(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return NONE_VALUE.to_string();
    }
    match trimmed.char_indices().nth(MAX_VALUE_LEN) {
        Some((cut, _)) => trimmed[..cut].to_string(),
        None => trimmed.to_string(),
    }
}

/// Whether a stored value means "nothing worn".
pub fn is_none_value(value: &str) -> bool {
    value == NONE_VALUE
}

/// A slot → value map for one owner in one instance.
///
/// Stored states are complete, but presets read from older documents may be
/// partial, so lookups go through [`OutfitState::value`] which falls back to
/// [`NONE_VALUE`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutfitState {
    slots: BTreeMap<Slot, String>,
}

impl OutfitState {
    /// A complete state with every slot given set to [`NONE_VALUE`].
    pub fn empty(slots: &[Slot]) -> Self {
        Self {
            slots: slots
                .iter()
                .map(|slot| (*slot, NONE_VALUE.to_string()))
                .collect(),
        }
    }

    /// The value of a slot, `"None"` if unset or missing.
    pub fn value(&self, slot: Slot) -> &str {
        self.slots.get(&slot).map(String::as_str).unwrap_or(NONE_VALUE)
    }

    /// Raw lookup that distinguishes a missing slot from a `"None"` one.
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Set a slot, normalizing the value. Returns the stored value.
    pub fn set(&mut self, slot: Slot, value: &str) -> &str {
        let normalized = normalize_value(Some(value));
        self.slots.insert(slot, normalized);
        self.value(slot)
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.slots.contains_key(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.slots.iter().map(|(slot, value)| (*slot, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots holding something other than `"None"`.
    pub fn worn(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.iter().filter(|(_, value)| !is_none_value(value))
    }
}

impl FromIterator<(Slot, String)> for OutfitState {
    fn from_iter<T: IntoIterator<Item = (Slot, String)>>(iter: T) -> Self {
        let mut state = OutfitState::default();
        for (slot, value) in iter {
            state.set(slot, &value);
        }
        state
    }
}
