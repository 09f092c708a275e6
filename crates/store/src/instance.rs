//! Conversation instance ids.
//!
//! An instance is identified by the text of its first message, so every
//! branch that shares an opening shares outfit state. Macro spans are
//! stripped first: a greeting hashes the same before and after the host
//! resolved `{{user}}` into a name wrapped in tags.

use outfitsync_commands::strip_macros;
use outfitsync_core::{ChatMessage, InstanceId};
use sha2::{Digest, Sha256};

const ID_HEX_LEN: usize = 16;

/// Hash normalized text into an instance id.
pub fn instance_id_for_text(text: &str) -> InstanceId {
    let stripped = strip_macros(text);
    let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let digest = Sha256::digest(normalized.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_HEX_LEN);
    InstanceId(id)
}

/// The instance id of a conversation, from its first non-system message.
///
/// Returns `None` for a conversation with nothing to hash yet.
pub fn derive_instance_id(messages: &[ChatMessage]) -> Option<InstanceId> {
    messages
        .iter()
        .find(|m| !m.is_system())
        .map(|m| instance_id_for_text(&m.content))
}
