//! Stage 2: turns one semantic unit into an ordered list of atomic
//! propositions.

use mnemo_llm::{parse_llm_json, LlmCompletion};
use mnemo_model::{ExtractionError, SemanticUnit};
use mnemo_prompt::build_stage2_prompt;

use crate::proto_proposition::ProtoProposition;
use crate::raw::RawProposition;

const STAGE2_MAX_TOKENS: u32 = 900;
const STAGE2_TEMPERATURE: f32 = 0.2;

/// Counts outside `[MIN_PROPOSITIONS, MAX_PROPOSITIONS]` are a Stage 2
/// error, per §4.4. `MIN_PROPOSITIONS` is 0 — an empty list is valid for
/// low-yield units (greetings, confirmations).
pub const MIN_PROPOSITIONS: usize = 0;
pub const MAX_PROPOSITIONS: usize = 10;

/// Runs Stage 2 on a single semantic unit. Observing an empty SU (Stage 1
/// failed upstream) must not fabricate propositions — callers should check
/// [`crate::is_empty_su`] before calling this and return an empty list
/// directly rather than invoking the model.
pub async fn propositionalize(llm: &dyn LlmCompletion, su: &SemanticUnit) -> Result<Vec<ProtoProposition>, ExtractionError> {
    if crate::is_empty_su(su) {
        return Ok(Vec::new());
    }

    let prompt = build_stage2_prompt(su);
    let raw_text = llm.complete(&prompt, STAGE2_MAX_TOKENS, STAGE2_TEMPERATURE).await?;
    let raw_props: Vec<RawProposition> = parse_llm_json(&raw_text)?;

    if raw_props.len() > MAX_PROPOSITIONS {
        return Err(ExtractionError::SchemaValidation {
            message: format!("semantic unit {} yielded {} propositions, exceeding the bound of {MAX_PROPOSITIONS}", su.unit_id, raw_props.len()),
        });
    }

    Ok(raw_props
        .into_iter()
        .map(|raw| ProtoProposition {
            su_id: su.unit_id.clone(),
            content: raw.content,
            // Inherited from the parent SU, never re-derived from the
            // model's per-proposition output (§4.4 metadata inheritance).
            su_type: su.su_type,
            certainty: su.certainty,
            concepts: if raw.concepts.is_empty() { su.concepts.clone() } else { raw.concepts },
            block_metadata: su.block_metadata.clone(),
            source_message_id: su.message_id.clone(),
            speaker: su.speaker.clone(),
            timestamp: su.timestamp,
        })
        .collect())
}
