//! Macro stripping for host-authored text.
//!
//! Removes every balanced `{{...}}` and `<...>` span, non-greedy, left to
//! right. Used before hashing conversation text so that a message hashes the
//! same whether or not its macros were already resolved.

/// Delete all `{{...}}` and `<...>` spans from `text`.
///
/// Each opener is closed by the nearest following closer. An opener with no
/// closer is kept verbatim.
pub fn strip_macros(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("{{") {
            if let Some(close) = after.find("}}") {
                rest = &after[close + 2..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix('<') {
            if let Some(close) = after.find('>') {
                rest = &after[close + 1..];
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}
