//! Stage 2 prompt template: propositionalizing a semantic unit into an
//! array of atomic propositions.
//!
//! The full SU is serialized as JSON and embedded in the prompt, the model
//! is asked to return a JSON array (never an object), and the rules restate
//! atomicity, self-containment, a proposition count bound, and that block
//! metadata and `su_id` are inherited rather than re-derived by the model.

use mnemo_model::SemanticUnit;

/// Builds the Stage 2 propositionalization prompt for a single semantic
/// unit, regardless of speaker — user-side and assistant-side units share
/// one prompt shape, differing only in which SU gets passed in.
pub fn build_stage2_prompt(su: &SemanticUnit) -> String {
    let su_json = serde_json::to_string_pretty(su).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"You are extracting atomic propositions from a semantic unit.

SEMANTIC UNIT:
{su_json}

TASK:
Produce a JSON array of propositions, each capturing exactly one verifiable statement drawn from the semantic unit's content.

RULES:
- One proposition = one self-contained, verifiable statement. Do not combine multiple facts into one proposition.
- Every proposition must be understandable without reading the semantic unit or any other proposition.
- Each proposition should relate to 1-2 core concepts.
- Produce at least 1 and at most 6 propositions.
- Do not invent facts not present in the semantic unit's content.
- Every proposition inherits su_id, type, certainty, and block_metadata from the semantic unit above — copy them through unchanged, do not re-derive them.

Return ONLY a JSON array matching this schema, no other text, no markdown fence:
[
  {{
    "su_id": "{unit_id}",
    "content": "...",
    "type": "{su_type}",
    "certainty": "{certainty}",
    "block_metadata": {block_metadata_json},
    "concepts": ["..."]
  }}
]"#,
        unit_id = su.unit_id,
        su_type = su_type_str(su),
        certainty = certainty_str(su),
        block_metadata_json = serde_json::to_string(&su.block_metadata).unwrap_or_else(|_| "{}".to_string()),
    )
}

fn su_type_str(su: &SemanticUnit) -> &'static str {
    use mnemo_model::SuType::*;
    match su.su_type {
        Question => "question",
        Statement => "statement",
        Decision => "decision",
        Resource => "resource",
        Document => "document",
        Response => "response",
        Explanation => "explanation",
        Other => "other",
    }
}

fn certainty_str(su: &SemanticUnit) -> &'static str {
    use mnemo_model::Certainty::*;
    match su.certainty {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mnemo_model::{BlockMetadata, Certainty, NarrativeRole, SuType};

    fn sample_su() -> SemanticUnit {
        SemanticUnit {
            unit_id: "su-42".to_string(),
            message_id: "msg-7".to_string(),
            content: "The user decided to use redb for the graph store.".to_string(),
            speaker: "user".to_string(),
            timestamp: Utc::now(),
            su_type: SuType::Decision,
            narrative_role: NarrativeRole::Core,
            certainty: Certainty::High,
            concepts: vec!["storage".to_string()],
            block_metadata: BlockMetadata::default(),
            entities: vec![],
            decisions: vec![],
            context_dependencies: vec![],
            impact: None,
            relevance: None,
        }
    }

    #[test]
    fn prompt_embeds_su_id_and_inherited_fields() {
        let prompt = build_stage2_prompt(&sample_su());
        assert!(prompt.contains("\"su_id\": \"su-42\""));
        assert!(prompt.contains("\"type\": \"decision\""));
        assert!(prompt.contains("\"certainty\": \"high\""));
    }

    #[test]
    fn prompt_requests_a_json_array_not_object() {
        let prompt = build_stage2_prompt(&sample_su());
        assert!(prompt.trim_end().ends_with(']') || prompt.contains("JSON array"));
    }
}
