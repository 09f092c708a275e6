//! The closed set of outfit slots.
//!
//! Slot names double as the suffix of macro tokens (`{{char_topwear}}`) and as
//! the third token of extracted commands (`outfit-system_wear_topwear(...)`),
//! so the string form of every variant is part of the wire format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One clothing or accessory category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Slot {
    Headwear,
    Topwear,
    Topunderwear,
    Bottomwear,
    Bottomunderwear,
    Footwear,
    Footunderwear,
    HeadAccessory,
    EarsAccessory,
    EyesAccessory,
    MouthAccessory,
    NeckAccessory,
    BodyAccessory,
    ArmsAccessory,
    HandsAccessory,
    WaistAccessory,
    BottomAccessory,
    LegsAccessory,
    FootAccessory,
}

impl Slot {
    /// Clothing slots, in display order.
    pub const CLOTHING: [Slot; 7] = [
        Slot::Headwear,
        Slot::Topwear,
        Slot::Topunderwear,
        Slot::Bottomwear,
        Slot::Bottomunderwear,
        Slot::Footwear,
        Slot::Footunderwear,
    ];

    /// Accessory slots, in display order.
    pub const ACCESSORIES: [Slot; 12] = [
        Slot::HeadAccessory,
        Slot::EarsAccessory,
        Slot::EyesAccessory,
        Slot::MouthAccessory,
        Slot::NeckAccessory,
        Slot::BodyAccessory,
        Slot::ArmsAccessory,
        Slot::HandsAccessory,
        Slot::WaistAccessory,
        Slot::BottomAccessory,
        Slot::LegsAccessory,
        Slot::FootAccessory,
    ];

    /// Every slot, clothing first.
    pub const ALL: [Slot; 19] = [
        Slot::Headwear,
        Slot::Topwear,
        Slot::Topunderwear,
        Slot::Bottomwear,
        Slot::Bottomunderwear,
        Slot::Footwear,
        Slot::Footunderwear,
        Slot::HeadAccessory,
        Slot::EarsAccessory,
        Slot::EyesAccessory,
        Slot::MouthAccessory,
        Slot::NeckAccessory,
        Slot::BodyAccessory,
        Slot::ArmsAccessory,
        Slot::HandsAccessory,
        Slot::WaistAccessory,
        Slot::BottomAccessory,
        Slot::LegsAccessory,
        Slot::FootAccessory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Headwear => "headwear",
            Slot::Topwear => "topwear",
            Slot::Topunderwear => "topunderwear",
            Slot::Bottomwear => "bottomwear",
            Slot::Bottomunderwear => "bottomunderwear",
            Slot::Footwear => "footwear",
            Slot::Footunderwear => "footunderwear",
            Slot::HeadAccessory => "head-accessory",
            Slot::EarsAccessory => "ears-accessory",
            Slot::EyesAccessory => "eyes-accessory",
            Slot::MouthAccessory => "mouth-accessory",
            Slot::NeckAccessory => "neck-accessory",
            Slot::BodyAccessory => "body-accessory",
            Slot::ArmsAccessory => "arms-accessory",
            Slot::HandsAccessory => "hands-accessory",
            Slot::WaistAccessory => "waist-accessory",
            Slot::BottomAccessory => "bottom-accessory",
            Slot::LegsAccessory => "legs-accessory",
            Slot::FootAccessory => "foot-accessory",
        }
    }

    /// Whether this is an accessory rather than a clothing slot.
    pub fn is_accessory(&self) -> bool {
        Self::ACCESSORIES.contains(self)
    }

    /// Split `token` into `(prefix, slot)` where `token` ends with `_<slot>`.
    ///
    /// The longest matching slot name wins, so owner names containing
    /// underscores split correctly: `Captain_Jack_topwear` → (`Captain_Jack`, topwear).
    /// Returns `None` when no slot suffix matches or the prefix would be empty.
    pub fn split_suffix(token: &str) -> Option<(&str, Slot)> {
        let mut best: Option<(&str, Slot)> = None;
        for slot in Self::ALL {
            let name = slot.as_str();
            let Some(head) = token.strip_suffix(name) else {
                continue;
            };
            let Some(prefix) = head.strip_suffix('_') else {
                continue;
            };
            if prefix.is_empty() {
                continue;
            }
            let longer = best.is_none_or(|(_, b)| name.len() > b.as_str().len());
            if longer {
                best = Some((prefix, slot));
            }
        }
        best
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no slot in the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown slot: {0}")]
pub struct UnknownSlot(pub String);

impl FromStr for Slot {
    type Err = UnknownSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| UnknownSlot(s.to_string()))
    }
}
