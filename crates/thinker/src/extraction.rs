//! Stage 1: turns a raw message into a `SemanticUnit`.

use chrono::{DateTime, Utc};
use mnemo_llm::{parse_llm_json, LlmCompletion};
use mnemo_model::{BlockMetadata, ExtractionError, Message, SemanticUnit};
use mnemo_prompt::{build_reasoning_prompt, build_stage1_assistant_prompt, build_stage1_user_prompt, context_window, HistoryItem};

use crate::raw::{parse_certainty_lenient, parse_narrative_role_lenient, RawSemanticUnit};

const STAGE1_MAX_TOKENS: u32 = 600;
const STAGE1_TEMPERATURE: f32 = 0.2;
const DEFAULT_CONTEXT_WINDOW: usize = 2;

/// Stage 1 for the user message. `unit_id` is set to the message's own id,
/// per §4.3's "caller-supplied message id" contract.
pub async fn extract_user_su(llm: &dyn LlmCompletion, history: &[HistoryItem], message: &Message) -> Result<SemanticUnit, ExtractionError> {
    let context = context_window(history, DEFAULT_CONTEXT_WINDOW);
    let prompt = build_stage1_user_prompt(
        &context,
        &message.message_id,
        &message.message_id,
        &message.timestamp.to_rfc3339(),
        &message.content,
    );
    let raw_text = llm.complete(&prompt, STAGE1_MAX_TOKENS, STAGE1_TEMPERATURE).await?;
    let raw: RawSemanticUnit = parse_llm_json(&raw_text)?;
    validate_and_convert(raw)
}

/// Stage 1 for the assistant message (V1: three-SU variant, reasoning
/// folded into this prompt as supplementary context if present).
pub async fn extract_assistant_su(
    llm: &dyn LlmCompletion,
    history: &[HistoryItem],
    user_message: &Message,
    assistant_message: &Message,
    assistant_reasoning: Option<&str>,
) -> Result<SemanticUnit, ExtractionError> {
    let mut extended = history.to_vec();
    extended.push(HistoryItem::user(user_message.content.clone()));
    let context = context_window(&extended, DEFAULT_CONTEXT_WINDOW);

    let prompt = build_stage1_assistant_prompt(
        &context,
        &assistant_message.message_id,
        &assistant_message.message_id,
        &assistant_message.timestamp.to_rfc3339(),
        &assistant_message.content,
        assistant_reasoning,
    );
    let raw_text = llm.complete(&prompt, STAGE1_MAX_TOKENS, STAGE1_TEMPERATURE).await?;
    let raw: RawSemanticUnit = parse_llm_json(&raw_text)?;
    validate_and_convert(raw)
}

/// Stage 1 for reasoning text (V2: two-SU variant, assistant message is
/// archived raw and never extracted). When `reasoning` is absent or blank
/// this produces the fixed placeholder content `"No reasoning provided"`
/// without an LLM call — the one case where a missing input does not
/// short-circuit its stage (§4.1 V2 boundary behavior).
pub async fn extract_reasoning_su(
    llm: &dyn LlmCompletion,
    history: &[HistoryItem],
    user_message: &Message,
    reasoning_unit_id: &str,
    reasoning_message_id: &str,
    timestamp: DateTime<Utc>,
    reasoning: Option<&str>,
) -> Result<SemanticUnit, ExtractionError> {
    match reasoning.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(missing_reasoning_su(reasoning_unit_id, reasoning_message_id, timestamp)),
        Some(text) => {
            let mut extended = history.to_vec();
            extended.push(HistoryItem::user(user_message.content.clone()));
            let context = context_window(&extended, DEFAULT_CONTEXT_WINDOW);

            let prompt = build_reasoning_prompt(&context, reasoning_unit_id, reasoning_message_id, &timestamp.to_rfc3339(), text);
            let raw_text = llm.complete(&prompt, STAGE1_MAX_TOKENS, STAGE1_TEMPERATURE).await?;
            let raw: RawSemanticUnit = parse_llm_json(&raw_text)?;
            validate_and_convert(raw)
        }
    }
}

fn missing_reasoning_su(unit_id: &str, message_id: &str, timestamp: DateTime<Utc>) -> SemanticUnit {
    use mnemo_model::{Certainty, NarrativeRole, SuType};
    SemanticUnit {
        unit_id: unit_id.to_string(),
        message_id: message_id.to_string(),
        content: "No reasoning provided".to_string(),
        speaker: "assistant_reasoning".to_string(),
        timestamp,
        su_type: SuType::Statement,
        narrative_role: NarrativeRole::Peripheral,
        certainty: Certainty::High,
        concepts: Vec::new(),
        block_metadata: BlockMetadata::default(),
        entities: Vec::new(),
        decisions: Vec::new(),
        context_dependencies: Vec::new(),
        impact: None,
        relevance: None,
    }
}

/// Converts a lenient wire-shape result into the strict domain type,
/// enforcing the one mandatory cross-field invariant: a decision-typed SU
/// must carry a non-empty `decision_reason` (§7, §8 invariant 6).
fn validate_and_convert(raw: RawSemanticUnit) -> Result<SemanticUnit, ExtractionError> {
    use mnemo_model::SuType;

    let su_type = SuType::parse_lenient(&raw.su_type);
    let narrative_role = parse_narrative_role_lenient(&raw.narrative_role);
    let certainty = parse_certainty_lenient(&raw.certainty);

    if su_type == SuType::Decision {
        let reason_present = raw
            .block_metadata
            .decision_reason
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if !reason_present {
            return Err(ExtractionError::SchemaValidation {
                message: format!("decision-typed semantic unit {} is missing a non-empty decision_reason", raw.unit_id),
            });
        }
    }

    Ok(SemanticUnit {
        unit_id: raw.unit_id,
        message_id: raw.message_id,
        content: raw.content,
        speaker: raw.speaker,
        timestamp: raw.timestamp,
        su_type,
        narrative_role,
        certainty,
        concepts: raw.concepts,
        block_metadata: raw.block_metadata,
        entities: raw.entities,
        decisions: raw.decisions,
        context_dependencies: raw.context_dependencies,
        impact: raw.impact,
        relevance: raw.relevance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mnemo_model::Role;
    use std::sync::Mutex;

    struct StubLlm {
        responses: Mutex<Vec<String>>,
    }

    impl StubLlm {
        fn once(response: impl Into<String>) -> Self {
            Self { responses: Mutex::new(vec![response.into()]) }
        }
    }

    #[async_trait]
    impl LlmCompletion for StubLlm {
        async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, ExtractionError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ExtractionError::LLMTransport { message: "no stubbed response left".to_string() })
        }
    }

    fn sample_message(id: &str, content: &str) -> Message {
        Message { message_id: id.to_string(), role: Role::User, content: content.to_string(), timestamp: Utc::now() }
    }

    #[tokio::test]
    async fn extracts_a_well_formed_statement() {
        let llm = StubLlm::once(
            r#"```json
            {"unit_id":"m1","message_id":"m1","content":"the user likes redb","speaker":"user","timestamp":"2026-01-01T00:00:00Z","type":"statement","narrative_role":"core","certainty":"high","concepts":["storage"]}
            ```"#,
        );
        let message = sample_message("m1", "I like redb");
        let su = extract_user_su(&llm, &[], &message).await.unwrap();
        assert_eq!(su.unit_id, "m1");
        assert_eq!(su.content, "the user likes redb");
    }

    #[tokio::test]
    async fn decision_without_reason_is_rejected() {
        let llm = StubLlm::once(
            r#"{"unit_id":"m2","message_id":"m2","content":"chose redb","speaker":"user","timestamp":"2026-01-01T00:00:00Z","type":"decision","narrative_role":"core","certainty":"high","concepts":["storage"],"block_metadata":{"decision_choice":"redb"}}"#,
        );
        let message = sample_message("m2", "let's use redb");
        let err = extract_user_su(&llm, &[], &message).await.unwrap_err();
        assert!(matches!(err, ExtractionError::SchemaValidation { .. }));
    }

    #[tokio::test]
    async fn unrecognized_type_degrades_to_other() {
        let llm = StubLlm::once(
            r#"{"unit_id":"m3","message_id":"m3","content":"sure","speaker":"user","timestamp":"2026-01-01T00:00:00Z","type":"confirmation","narrative_role":"peripheral","certainty":"high","concepts":[]}"#,
        );
        let message = sample_message("m3", "sure");
        let su = extract_user_su(&llm, &[], &message).await.unwrap();
        assert_eq!(su.su_type, mnemo_model::SuType::Other);
    }

    #[tokio::test]
    async fn missing_reasoning_produces_placeholder_without_calling_llm() {
        let llm = StubLlm { responses: Mutex::new(vec![]) };
        let user_message = sample_message("u1", "hello");
        let su = extract_reasoning_su(&llm, &[], &user_message, "r1", "a1_reasoning", Utc::now(), None).await.unwrap();
        assert_eq!(su.content, "No reasoning provided");
        assert!(su.block_metadata.is_empty());
    }
}
