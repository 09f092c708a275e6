//! `outfitsync extract` — Show the commands found in text.

use outfitsync_commands::{extract_commands, parse_command};
use outfitsync_core::Slot;

use super::{text_or_stdin, CliResult};

pub async fn run(text: Option<String>) -> CliResult {
    let text = text_or_stdin(text)?;
    for line in describe(&text) {
        println!("{line}");
    }
    Ok(())
}

/// One line per extracted command: its parse and confidence, or why it failed.
pub fn describe(text: &str) -> Vec<String> {
    let found = extract_commands(text);
    if found.is_empty() {
        return vec!["No commands found".into()];
    }

    found
        .into_iter()
        .map(|raw| match parse_command(&raw) {
            Ok(command) => {
                let confidence = command.confidence(&Slot::ALL);
                let mark = if confidence.passes() { "✅" } else { "⚠️ " };
                format!("{mark} {command}  (confidence {confidence})")
            }
            Err(e) => format!("❌ {raw}  ({e})"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_each_command() {
        let lines = describe(
            r#"She smiles. outfit-system_wear_headwear("sun hat") and outfit-system_remove_cape()"#,
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("✅"));
        assert!(lines[0].contains("confidence 1.0"));
        // An unknown slot still parses and lands on the threshold
        assert!(lines[1].contains("confidence 0.7"));
    }

    #[test]
    fn unparsable_call_is_reported() {
        let lines = describe("outfit-system_wear_headwear(\"sun hat\", \"extra\")");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("❌"), "{lines:?}");
    }

    #[test]
    fn nothing_found() {
        assert_eq!(describe("plain prose"), vec!["No commands found".to_string()]);
    }
}
