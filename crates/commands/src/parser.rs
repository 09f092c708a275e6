//! Strict parser for a single extracted command substring.

use crate::model::{Action, Command};
use crate::scanner::NAMESPACE;
use crate::ParseError;

/// Parse one command call into a [`Command`].
///
/// The input is expected to be a substring returned by
/// [`crate::extract_commands`], but any text is accepted and validated. The
/// argument must be empty or a single double-quoted string; inside it `\x`
/// yields `x` (so `\"` is a quote and `\\` a backslash).
pub fn parse_command(raw: &str) -> Result<Command, ParseError> {
    let raw = raw.trim();
    let rest = raw.strip_prefix(NAMESPACE).ok_or(ParseError::MissingNamespace)?;

    let (action_token, rest) = rest
        .split_once('_')
        .ok_or_else(|| ParseError::UnknownAction(rest.to_string()))?;
    let action: Action = action_token.parse()?;

    let (slot, args) = rest.split_once('(').ok_or(ParseError::MissingArguments)?;
    if slot.is_empty() || !slot.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
        return Err(ParseError::InvalidSlotToken(slot.to_string()));
    }

    let inner = args.strip_suffix(')').ok_or(ParseError::MissingArguments)?;
    let value = parse_argument(inner)?;

    Ok(Command::new(action, slot, value))
}

/// Parse the text between the parentheses.
fn parse_argument(inner: &str) -> Result<String, ParseError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(String::new());
    }

    let mut chars = inner.chars();
    if chars.next() != Some('"') {
        return Err(ParseError::UnquotedArgument(inner.to_string()));
    }

    let mut value = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(escaped) => value.push(escaped),
                None => return Err(ParseError::UnterminatedString),
            },
            Some('"') => break,
            Some(c) => value.push(c),
            None => return Err(ParseError::UnterminatedString),
        }
    }

    let trailing = chars.as_str().trim();
    if !trailing.is_empty() {
        return Err(ParseError::TrailingInput(trailing.to_string()));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_wear_with_value() {
        let cmd = parse_command(r#"outfit-system_wear_headwear("red cap")"#).unwrap();
        assert_eq!(cmd.action, Action::Wear);
        assert_eq!(cmd.slot, "headwear");
        assert_eq!(cmd.value, "red cap");
    }

    #[test]
    fn parse_empty_argument() {
        let cmd = parse_command("outfit-system_remove_topwear()").unwrap();
        assert_eq!(cmd.action, Action::Remove);
        assert_eq!(cmd.value, "");

        let cmd = parse_command("outfit-system_unequip_footwear(  )").unwrap();
        assert_eq!(cmd.action, Action::Unequip);
        assert_eq!(cmd.value, "");
    }

    #[test]
    fn escaped_quotes_roundtrip() {
        let cmd = parse_command(r#"outfit-system_wear_headwear("a \"red\" cap")"#).unwrap();
        assert_eq!(cmd.value, r#"a "red" cap"#);
    }

    #[test]
    fn escaped_backslash() {
        let cmd = parse_command(r#"outfit-system_wear_topwear("back\\slash")"#).unwrap();
        assert_eq!(cmd.value, r"back\slash");
    }

    #[test]
    fn parens_inside_value_kept() {
        let cmd = parse_command(r#"outfit-system_change_topwear("shirt (blue)")"#).unwrap();
        assert_eq!(cmd.action, Action::Change);
        assert_eq!(cmd.value, "shirt (blue)");
    }

    #[test]
    fn hyphenated_slot() {
        let cmd = parse_command(r#"outfit-system_wear_neck-accessory("pearls")"#).unwrap();
        assert_eq!(cmd.slot, "neck-accessory");
    }

    #[test]
    fn unknown_slot_still_parses() {
        let cmd = parse_command(r#"outfit-system_wear_cape("velvet")"#).unwrap();
        assert_eq!(cmd.slot, "cape");
        assert!(cmd.slot().is_none());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            parse_command(r#"wear_headwear("cap")"#),
            Err(ParseError::MissingNamespace)
        );
        assert_eq!(
            parse_command(r#"outfit-system_don_headwear("cap")"#),
            Err(ParseError::UnknownAction("don".into()))
        );
        assert_eq!(
            parse_command(r#"outfit-system_wear_("cap")"#),
            Err(ParseError::InvalidSlotToken(String::new()))
        );
        assert_eq!(
            parse_command(r#"outfit-system_wear_headwear"#),
            Err(ParseError::MissingArguments)
        );
        assert_eq!(
            parse_command(r#"outfit-system_wear_headwear(cap)"#),
            Err(ParseError::UnquotedArgument("cap".into()))
        );
        assert_eq!(
            parse_command(r#"outfit-system_wear_headwear("cap)"#),
            Err(ParseError::UnterminatedString)
        );
        assert_eq!(
            parse_command(r#"outfit-system_wear_headwear("cap" "hat")"#),
            Err(ParseError::TrailingInput("\"hat\"".into()))
        );
    }

    #[test]
    fn every_extracted_command_parses() {
        let text = r#"outfit-system_wear_headwear("cap") and outfit-system_replace_topwear("coat (wool)")"#;
        for raw in crate::extract_commands(text) {
            assert!(parse_command(&raw).is_ok(), "failed on {raw}");
        }
    }
}
