//! Command scanner — finds command calls in free-form text.
//!
//! The scanner returns the literal substring of each call. It validates only
//! the shape (namespace, action token, slot alphabet, balanced argument);
//! [`crate::parse_command`] turns a substring into a [`crate::Command`].

use tracing::debug;

use crate::model::Action;

/// Marker every command starts with.
pub const NAMESPACE: &str = "outfit-system_";

/// Why a candidate was rejected. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reject {
    Action,
    Slot,
    NoArguments,
    Unterminated,
}

fn is_slot_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Extract every command call in `text`, in order of appearance.
///
/// A rejected candidate resumes scanning one character past its start, so a
/// near-miss never swallows a valid call that begins inside it.
pub fn extract_commands(text: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find(NAMESPACE) {
        let start = pos + offset;
        match scan_candidate(text.as_bytes(), start) {
            Ok(end) => {
                commands.push(text[start..end].to_string());
                pos = end;
            }
            Err(reason) => {
                debug!(offset = start, ?reason, "Rejected command candidate");
                // `start` indexes an ASCII byte, so `start + 1` is a char boundary
                pos = start + 1;
            }
        }
    }

    commands
}

/// Scan one candidate starting at the namespace marker. Returns the end offset
/// (exclusive) of the call on success.
fn scan_candidate(bytes: &[u8], start: usize) -> Result<usize, Reject> {
    let mut i = start + NAMESPACE.len();

    // action token: letters up to '_'
    let action_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'_' {
        return Err(Reject::Action);
    }
    let action = std::str::from_utf8(&bytes[action_start..i]).map_err(|_| Reject::Action)?;
    if action.parse::<Action>().is_err() {
        return Err(Reject::Action);
    }
    i += 1;

    // slot token: maximal run of the slot alphabet up to '('
    let slot_start = i;
    while i < bytes.len() && is_slot_byte(bytes[i]) {
        i += 1;
    }
    if i == slot_start {
        return Err(Reject::Slot);
    }
    if i >= bytes.len() || bytes[i] != b'(' {
        return Err(Reject::NoArguments);
    }

    scan_arguments(bytes, i)
}

/// Scan a parenthesized argument list starting at `open` (which must be `(`).
///
/// Characters inside a double-quoted span do not affect depth, and `\"` inside
/// a quoted span does not close it.
fn scan_arguments(bytes: &[u8], open: usize) -> Result<usize, Reject> {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            match b {
                b'\\' => i += 1,
                b'"' => in_quote = false,
                _ => {}
            }
        } else {
            match b {
                b'"' => in_quote = true,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i + 1);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    Err(Reject::Unterminated)
}
