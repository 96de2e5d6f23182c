//! Stage 1 prompt templates: user-message and assistant-message semantic
//! unit extraction, plus the V2 reasoning-note variant.
//!
//! Each prompt has the same shape: a role declaration, a CONTEXT block (the
//! rendered context window), a MESSAGE block with the speaker/timestamp/
//! JSON-escaped content, task instructions, a literal JSON schema skeleton
//! with `unit_id` pre-filled, and a closing "return ONLY the JSON object"
//! instruction. Pre-filling identifiers into the skeleton means the model
//! only ever has to fill in classification and content fields, never invent
//! an id. The assistant variant folds an optional reasoning note into the
//! prompt when present (V1's reasoning-folded-into-assistant-SU mode).

/// Builds the Stage 1 user-message extraction prompt.
///
/// `unit_id` / `message_id` are pre-filled into the schema skeleton, so the
/// model only has to fill in classification and content fields, never
/// invent identifiers.
pub fn build_stage1_user_prompt(
    context: &str,
    unit_id: &str,
    message_id: &str,
    timestamp: &str,
    content: &str,
) -> String {
    let escaped_content = serde_json::to_string(content).unwrap_or_else(|_| format!("{content:?}"));
    format!(
        r#"You are a conversation analyzer. Read the message below and produce a single semantic unit describing it.

CONTEXT:
{context}

MESSAGE:
Speaker: user
Time: {timestamp}
Content: {escaped_content}

TASK:
- Reformulate the message as a self-contained statement, resolving pronouns and other references using the context above.
- Classify its type: one of question, statement, decision, resource, document, confirmation.
- Classify its narrative_role: core, supportive, or peripheral.
- Classify your certainty in this reading: high, medium, or low.
- List 1-3 concepts the message is about.

BLOCKS RULES:
- If type is "resource": block_metadata must include resource_url (required), resource_type, resource_title, discussed_context.
- If type is "decision": block_metadata must include decision_choice, decision_reason (REQUIRED), decision_alternatives, decision_confidence.
- If type is "document": block_metadata must include doc_filename, doc_location, doc_purpose, doc_key_settings.
- Otherwise leave block_metadata fields null.

Return ONLY a JSON object matching this schema, no other text, no markdown fence:
{{
  "unit_id": "{unit_id}",
  "message_id": "{message_id}",
  "content": "...",
  "speaker": "user",
  "timestamp": "{timestamp}",
  "type": "statement",
  "narrative_role": "core",
  "certainty": "high",
  "concepts": ["..."],
  "block_metadata": {{}},
  "entities": [],
  "decisions": [],
  "context_dependencies": [],
  "impact": null,
  "relevance": null
}}"#
    )
}

/// Builds the Stage 1 assistant-message extraction prompt. `reasoning_note`
/// carries the model's chain-of-thought, when the upstream chat turn
/// produced one, folded into the prompt as extra context (V1 semantics —
/// the reasoning becomes part of a single assistant SU rather than its own).
pub fn build_stage1_assistant_prompt(
    context: &str,
    unit_id: &str,
    message_id: &str,
    timestamp: &str,
    content: &str,
    reasoning_note: Option<&str>,
) -> String {
    let escaped_content = serde_json::to_string(content).unwrap_or_else(|_| format!("{content:?}"));
    let reasoning_block = match reasoning_note {
        Some(note) if !note.trim().is_empty() => {
            format!("\nREASONING (for your understanding only, do not quote verbatim):\n{note}\n")
        }
        _ => String::new(),
    };
    format!(
        r#"You are a conversation analyzer. Read the assistant's reply below and produce a single semantic unit describing it.

CONTEXT:
{context}

MESSAGE:
Speaker: assistant
Time: {timestamp}
Content: {escaped_content}
{reasoning_block}
TASK:
- Reformulate the reply as a self-contained statement, resolving pronouns and other references using the context above.
- Classify its type: one of response, explanation, suggestion, implementation.
- Classify its narrative_role: core, supportive, or peripheral.
- Classify your certainty in this reading: high, medium, or low.
- List 1-3 concepts the reply is about.

BLOCKS RULES:
- If type implies a resource was shared: block_metadata must include resource_url (required), resource_type, resource_title, discussed_context.
- If type implies a decision was made: block_metadata must include decision_choice, decision_reason (REQUIRED), decision_alternatives, decision_confidence.
- If type implies a document was described: block_metadata must include doc_filename, doc_location, doc_purpose, doc_key_settings.
- Otherwise leave block_metadata fields null.

Return ONLY a JSON object matching this schema, no other text, no markdown fence:
{{
  "unit_id": "{unit_id}",
  "message_id": "{message_id}",
  "content": "...",
  "speaker": "assistant",
  "timestamp": "{timestamp}",
  "type": "response",
  "narrative_role": "core",
  "certainty": "high",
  "concepts": ["..."],
  "block_metadata": {{}},
  "entities": [],
  "decisions": [],
  "context_dependencies": [],
  "impact": null,
  "relevance": null
}}"#
    )
}

/// Builds the V2 reasoning-unit extraction prompt: reasoning is
/// propositionalized on its own rather than folded into the assistant SU.
/// When the model produced no reasoning, callers skip this prompt entirely
/// and substitute the fixed content `"No reasoning provided"` (SPEC_FULL
/// §8's V2 boundary behavior) rather than calling this function with empty
/// input.
pub fn build_reasoning_prompt(context: &str, unit_id: &str, message_id: &str, timestamp: &str, reasoning: &str) -> String {
    let escaped = serde_json::to_string(reasoning).unwrap_or_else(|_| format!("{reasoning:?}"));
    format!(
        r#"You are a conversation analyzer. Read the assistant's internal reasoning below and produce a single semantic unit describing the logic it followed.

CONTEXT:
{context}

REASONING:
Time: {timestamp}
Content: {escaped}

TASK:
- Reformulate the reasoning as a self-contained statement of the logic followed, resolving pronouns and other references using the context above.
- Classify its type: one of explanation, decision, statement.
- Classify its narrative_role: core, supportive, or peripheral.
- Classify your certainty in this reading: high, medium, or low.
- List 1-3 concepts the reasoning is about.

Return ONLY a JSON object matching this schema, no other text, no markdown fence:
{{
  "unit_id": "{unit_id}",
  "message_id": "{message_id}",
  "content": "...",
  "speaker": "assistant_reasoning",
  "timestamp": "{timestamp}",
  "type": "explanation",
  "narrative_role": "supportive",
  "certainty": "medium",
  "concepts": ["..."],
  "block_metadata": {{}},
  "entities": [],
  "decisions": [],
  "context_dependencies": [],
  "impact": null,
  "relevance": null
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_embeds_prefilled_ids() {
        let prompt = build_stage1_user_prompt("Start of conversation", "su-1", "msg-1", "2026-01-01T00:00:00Z", "hello there");
        assert!(prompt.contains("\"unit_id\": \"su-1\""));
        assert!(prompt.contains("\"message_id\": \"msg-1\""));
        assert!(prompt.contains("\"hello there\""));
    }

    #[test]
    fn assistant_prompt_without_reasoning_omits_reasoning_block() {
        let prompt = build_stage1_assistant_prompt("ctx", "su-2", "msg-2", "t", "an answer", None);
        assert!(!prompt.contains("REASONING (for your understanding only"));
    }

    #[test]
    fn assistant_prompt_with_reasoning_includes_it() {
        let prompt = build_stage1_assistant_prompt("ctx", "su-2", "msg-2", "t", "an answer", Some("because X implies Y"));
        assert!(prompt.contains("because X implies Y"));
    }

    #[test]
    fn content_with_quotes_is_json_escaped_not_raw_concatenated() {
        let prompt = build_stage1_user_prompt("ctx", "su-3", "msg-3", "t", "she said \"hi\"");
        assert!(prompt.contains("she said \\\"hi\\\""));
    }
}
