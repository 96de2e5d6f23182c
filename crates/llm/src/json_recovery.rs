//! Code-fence stripping a model response is run through before a JSON
//! parse is attempted.
//!
//! A strict sequential strip (leading fence, then trailing fence, in that
//! order) rather than a find-and-slice-between-fences scan: the two agree
//! on clean single-fenced output, but the sequential version is also
//! idempotent on already-clean JSON and doesn't get confused by a stray
//! fence-like token in trailing prose after a closing fence.

/// Strips surrounding whitespace and a leading/trailing code-fence marker,
/// in that exact order, so the result can be handed to `serde_json::from_str`.
///
/// 1. Trim whitespace.
/// 2. If it starts with ` ```json `, strip exactly those 7 characters;
///    else if it starts with ` ``` `, strip exactly those 3 characters.
/// 3. If the (possibly already-stripped) text ends with ` ``` `, strip the
///    trailing 3 characters.
/// 4. Trim whitespace again.
pub fn recover_json(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}
