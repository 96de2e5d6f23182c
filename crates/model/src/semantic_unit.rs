use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BlockMetadata;

/// Classification of a semantic unit. Unknown values encountered while
/// parsing model output degrade to `Other` rather than failing — see
/// `SuType::parse_lenient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuType {
    Question,
    Statement,
    Decision,
    Resource,
    Document,
    Response,
    Explanation,
    Other,
}

impl SuType {
    /// Parses a model-supplied type string, degrading unknown values to
    /// `Other` instead of failing the whole extraction.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "question" => Self::Question,
            "statement" => Self::Statement,
            "decision" => Self::Decision,
            "resource" => Self::Resource,
            "document" => Self::Document,
            "response" => Self::Response,
            "explanation" => Self::Explanation,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeRole {
    Core,
    Supportive,
    Peripheral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Certainty {
    High,
    Medium,
    Low,
}

/// A reformulated, self-contained description of one message, produced by
/// Stage 1. Immutable after commit; lives in the archive only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticUnit {
    pub unit_id: String,
    pub message_id: String,
    pub content: String,
    pub speaker: String,
    pub timestamp: DateTime<Utc>,
    pub su_type: SuType,
    pub narrative_role: NarrativeRole,
    pub certainty: Certainty,
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

impl SemanticUnit {
    /// Whether this unit should be bounded to at most one proposition
    /// during Stage 2 (greetings, confirmations, peripheral chatter).
    pub fn is_low_yield(&self) -> bool {
        self.narrative_role == NarrativeRole::Peripheral
    }
}
