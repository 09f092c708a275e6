//! Persisted state document and the backend trait that stores it.
//!
//! The whole store serializes to one JSON document with four top-level keys:
//! persona instances, user instances, presets, and settings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StorageError;
use crate::outfit::{InstanceId, OutfitState, OwnerId};

fn default_true() -> bool {
    true
}

/// One owner's outfit in one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub slots: OutfitState,

    /// Whether this outfit is rendered into prompts via macros
    #[serde(default = "default_true")]
    pub prompt_injection_enabled: bool,
}

impl InstanceRecord {
    pub fn new(slots: OutfitState) -> Self {
        Self {
            slots,
            prompt_injection_enabled: true,
        }
    }
}

/// Named presets, grouped by scope key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetBook {
    /// `"{owner_id}_{instance_id}"` → preset name → snapshot
    #[serde(default)]
    pub persona: BTreeMap<String, BTreeMap<String, OutfitState>>,

    /// instance id → preset name → snapshot
    #[serde(default)]
    pub user: BTreeMap<String, BTreeMap<String, OutfitState>>,
}

/// Default-preset pointers, keyed like [`PresetBook`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPresets {
    #[serde(default)]
    pub persona: BTreeMap<String, String>,

    #[serde(default)]
    pub user: BTreeMap<String, String>,
}

/// Store-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub default_presets: DefaultPresets,

    /// Free-form settings written through `set_setting`, kept apart from
    /// the reserved keys above
    #[serde(default)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// The complete persisted state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub persona_instances: BTreeMap<OwnerId, BTreeMap<InstanceId, InstanceRecord>>,

    #[serde(default)]
    pub user_instances: BTreeMap<InstanceId, InstanceRecord>,

    #[serde(default)]
    pub presets: PresetBook,

    #[serde(default)]
    pub settings: StoreSettings,
}

/// Where the state document lives between runs.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// A short name for logs (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Load the stored document, `None` if nothing was stored yet.
    async fn load(&self) -> Result<Option<StateDocument>, StorageError>;

    /// Stage a document for storage.
    async fn save(&self, document: &StateDocument) -> Result<(), StorageError>;

    /// Make staged writes durable.
    async fn flush(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Slot;

    #[test]
    fn empty_document_roundtrips() {
        let doc = StateDocument::default();
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: StateDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn document_top_level_keys() {
        let json = serde_json::to_value(StateDocument::default()).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["persona_instances", "user_instances", "presets", "settings"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn missing_injection_flag_defaults_to_true() {
        let record: InstanceRecord =
            serde_json::from_str(r#"{"slots":{"topwear":"coat"}}"#).unwrap();
        assert!(record.prompt_injection_enabled);
        assert_eq!(record.slots.value(Slot::Topwear), "coat");
    }

    #[test]
    fn free_form_settings_nest_under_values() {
        let mut settings = StoreSettings::default();
        settings.values.insert("auto_update".into(), serde_json::json!(true));
        settings.values.insert("default_presets".into(), serde_json::json!("x"));
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["values"]["auto_update"], serde_json::json!(true));
        assert!(json["default_presets"].is_object());

        let parsed: StoreSettings = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, settings);
    }
}
