//! Wire-shape structs matching exactly what the Stage 1/Stage 2 prompts ask
//! the model to return, before lenient parsing converts them into the
//! strict `mnemo_model` types. Kept separate from `mnemo_model::SemanticUnit`
//! because model output uses raw strings for enum fields (`"type":
//! "confirmation"`) that must degrade gracefully rather than fail `serde`
//! deserialization outright.

use chrono::{DateTime, Utc};
use mnemo_model::BlockMetadata;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawSemanticUnit {
    pub unit_id: String,
    pub message_id: String,
    pub content: String,
    pub speaker: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub su_type: String,
    pub narrative_role: String,
    pub certainty: String,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub block_metadata: BlockMetadata,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub context_dependencies: Vec<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub relevance: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawProposition {
    pub su_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub su_type: String,
    pub certainty: String,
    #[serde(default)]
    pub block_metadata: BlockMetadata,
    #[serde(default)]
    pub concepts: Vec<String>,
}

/// Degrades an unrecognized narrative role string to `Supportive` — the
/// middle ground, matching how `SuType::parse_lenient` degrades unknown
/// types to `Other` rather than failing the whole extraction.
pub fn parse_narrative_role_lenient(raw: &str) -> mnemo_model::NarrativeRole {
    use mnemo_model::NarrativeRole::*;
    match raw.to_ascii_lowercase().as_str() {
        "core" => Core,
        "peripheral" => Peripheral,
        _ => Supportive,
    }
}

pub fn parse_certainty_lenient(raw: &str) -> mnemo_model::Certainty {
    use mnemo_model::Certainty::*;
    match raw.to_ascii_lowercase().as_str() {
        "high" => High,
        "low" => Low,
        _ => Medium,
    }
}
