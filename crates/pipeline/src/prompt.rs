//! The instructions sent to the model.

use outfitsync_commands::NAMESPACE;
use outfitsync_core::Slot;

/// The built-in system prompt.
///
/// Current slot values appear as `{{char_<slot>}}` macros and are rendered
/// right before each request, so the model always sees the live outfit.
pub fn default_system_prompt() -> String {
    let mut prompt = String::from(
        "You track what {{char}} is wearing in an ongoing story. \
         Read the latest messages and decide whether {{char}} put on, took off, \
         or changed any item of clothing or accessory.\n\n\
         Current outfit:\n",
    );

    for slot in Slot::ALL {
        prompt.push_str(&format!("- {slot}: {{{{char_{slot}}}}}\n"));
    }

    prompt.push_str(&format!(
        "\nAnswer ONLY with one command per change, nothing else:\n\
         {NAMESPACE}wear_<slot>(\"item\")     put something on an empty slot\n\
         {NAMESPACE}change_<slot>(\"item\")   replace what a slot holds\n\
         {NAMESPACE}remove_<slot>()         take off what a slot holds\n\n\
         Use only the slot names listed above. Escape quotes inside items as \\\". \
         If nothing changed, answer with nothing.\n"
    ));

    prompt
}
