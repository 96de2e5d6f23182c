//! The context-window builder: takes the last `k` items of a conversation
//! history and renders them as `"User: …" / "Assistant: …"` lines, or the
//! literal `"Start of conversation"` when there is no history at all.
//!
//! Slices the *last* `max_messages` items, not the first — recent context
//! is what the model needs to disambiguate a pronoun or follow-up, not the
//! start of a long conversation.

use serde::{Deserialize, Serialize};

/// One prior turn's role+content, as supplied in `conversation_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub role: String,
    pub content: String,
}

impl HistoryItem {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// Renders the last `max_messages` items of `history` as "User: …" /
/// "Assistant: …" lines. Returns the literal `"Start of conversation"` when
/// `history` is empty — this is a sentinel string, not an empty one, so
/// prompt templates can interpolate it directly.
///
/// Pure: depends only on its arguments, no clock, no global state. This is
/// what makes the "context-window monotonicity" law (SPEC_FULL §8)
/// property-testable — changing items *before* the last `max_messages` can
/// never change the result.
pub fn context_window(history: &[HistoryItem], max_messages: usize) -> String {
    if history.is_empty() {
        return "Start of conversation".to_string();
    }
    let start = history.len().saturating_sub(max_messages);
    history[start..]
        .iter()
        .map(|item| {
            let role = if item.role.eq_ignore_ascii_case("user") { "User" } else { "Assistant" };
            format!("{role}: {}", item.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_is_start_of_conversation() {
        assert_eq!(context_window(&[], 2), "Start of conversation");
    }

    #[test]
    fn takes_only_the_last_k_items() {
        let history = vec![
            HistoryItem::user("first"),
            HistoryItem::assistant("second"),
            HistoryItem::user("third"),
            HistoryItem::assistant("fourth"),
        ];
        assert_eq!(context_window(&history, 2), "User: third\nAssistant: fourth");
    }

    #[test]
    fn k_larger_than_history_returns_everything() {
        let history = vec![HistoryItem::user("only one")];
        assert_eq!(context_window(&history, 5), "User: only one");
    }

    #[test]
    fn monotonicity_earlier_items_do_not_affect_window() {
        let tail = vec![HistoryItem::user("a"), HistoryItem::assistant("b")];
        let mut short = tail.clone();
        let mut long = vec![HistoryItem::user("zzz"), HistoryItem::assistant("yyy"), HistoryItem::user("xxx")];
        long.extend(tail.clone());
        short.insert(0, HistoryItem::user("irrelevant earlier turn"));

        assert_eq!(context_window(&long, 2), context_window(&tail, 2));
        // Changing what precedes the last k items must not change the result.
        assert_eq!(context_window(&long, 2), "User: a\nAssistant: b");
        let _ = short; // demonstrates an alternate prefix, same tail
    }
}
