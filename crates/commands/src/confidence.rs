//! Confidence scoring for parsed commands.
//!
//! Weights: 0.5 for parsing at all, 0.2 for a known action, 0.2 for a slot in
//! the caller's valid set, 0.1 when a value-carrying action has a value. Scores
//! are held in tenths so the 0.7 threshold compares exactly.

use outfitsync_core::Slot;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Action, Command};

/// A score in `[0.0, 1.0]`, stored in tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Confidence(u8);

/// Commands scoring below this are never applied.
pub const MIN_CONFIDENCE: Confidence = Confidence(7);

const BASE: u8 = 5;
const KNOWN_ACTION: u8 = 2;
const VALID_SLOT: u8 = 2;
const HAS_VALUE: u8 = 1;
const MAX: u8 = 10;

impl Confidence {
    pub const fn from_tenths(tenths: u8) -> Self {
        Self(if tenths > MAX { MAX } else { tenths })
    }

    pub fn tenths(self) -> u8 {
        self.0
    }

    pub fn value(self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Whether the command may be applied. The threshold is inclusive.
    pub fn passes(self) -> bool {
        self >= MIN_CONFIDENCE
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

/// Score a command given as raw tokens.
pub fn score(action: &str, slot: &str, value: &str, valid_slots: &[Slot]) -> Confidence {
    let mut tenths = BASE;

    let action = action.parse::<Action>().ok();
    if action.is_some() {
        tenths += KNOWN_ACTION;
    }

    if slot.parse::<Slot>().is_ok_and(|s| valid_slots.contains(&s)) {
        tenths += VALID_SLOT;
    }

    if action.is_some_and(|a| a.implies_value()) && !value.trim().is_empty() {
        tenths += HAS_VALUE;
    }

    Confidence::from_tenths(tenths)
}

impl Command {
    /// Score this command against the slots its target owner supports.
    pub fn confidence(&self, valid_slots: &[Slot]) -> Confidence {
        score(self.action.as_str(), &self.slot, &self.value, valid_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_score_for_valid_wear() {
        let cmd = Command::new(Action::Wear, "headwear", "cap");
        let c = cmd.confidence(&Slot::ALL);
        assert_eq!(c.tenths(), 10);
        assert!((c.value() - 1.0).abs() < f64::EPSILON);
        assert!(c.passes());
    }

    #[test]
    fn remove_without_value_passes() {
        let cmd = Command::new(Action::Remove, "headwear", "");
        assert_eq!(cmd.confidence(&Slot::ALL).tenths(), 9);
    }

    #[test]
    fn invalid_slot_lands_on_threshold_and_passes() {
        let cmd = Command::new(Action::Remove, "cape", "");
        let c = cmd.confidence(&Slot::ALL);
        assert_eq!(c, MIN_CONFIDENCE);
        assert!(c.passes());
        assert_eq!(c.to_string(), "0.7");
    }

    #[test]
    fn slot_outside_owner_set_scores_lower() {
        let cmd = Command::new(Action::Wear, "neck-accessory", "choker");
        assert_eq!(cmd.confidence(&Slot::CLOTHING).tenths(), 8);
        assert_eq!(cmd.confidence(&Slot::ALL).tenths(), 10);
    }

    #[test]
    fn wear_without_value_misses_value_bonus() {
        let cmd = Command::new(Action::Wear, "headwear", "  ");
        assert_eq!(cmd.confidence(&Slot::ALL).tenths(), 9);
    }

    #[test]
    fn unknown_action_falls_below_threshold() {
        let c = score("don", "headwear", "cap", &Slot::ALL);
        assert_eq!(c.tenths(), 7);
        let c = score("don", "cape", "cap", &Slot::ALL);
        assert_eq!(c.tenths(), 5);
        assert!(!c.passes());
    }

    #[test]
    fn from_tenths_caps_at_one() {
        assert_eq!(Confidence::from_tenths(14).tenths(), 10);
    }
}
