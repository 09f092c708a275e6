//! Command data model.

use outfitsync_core::Slot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseError;

/// What a command does to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Wear,
    Remove,
    Change,
    /// Alias of [`Action::Change`]
    Replace,
    /// Alias of [`Action::Remove`]
    Unequip,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Wear,
        Action::Remove,
        Action::Change,
        Action::Replace,
        Action::Unequip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Wear => "wear",
            Action::Remove => "remove",
            Action::Change => "change",
            Action::Replace => "replace",
            Action::Unequip => "unequip",
        }
    }

    /// Resolve aliases: `replace` → `change`, `unequip` → `remove`.
    pub fn canonical(self) -> Action {
        match self {
            Action::Replace => Action::Change,
            Action::Unequip => Action::Remove,
            other => other,
        }
    }

    /// Whether the action carries an item description.
    pub fn implies_value(self) -> bool {
        matches!(self.canonical(), Action::Wear | Action::Change)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))
    }
}

/// One structured edit extracted from model output.
///
/// `slot` is kept as written: the scanner only guarantees it uses the slot
/// alphabet, not that it names a real slot. Scoring and application decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    pub slot: String,
    pub value: String,
}

impl Command {
    pub fn new(action: Action, slot: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            action,
            slot: slot.into(),
            value: value.into(),
        }
    }

    /// The slot, if it names one in the closed set.
    pub fn slot(&self) -> Option<Slot> {
        self.slot.parse().ok()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.action, self.slot)?;
        if !self.value.is_empty() {
            write!(f, ", {:?}", self.value)?;
        }
        f.write_str(")")
    }
}
