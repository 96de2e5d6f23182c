use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block_metadata::BlockMetadata;
use crate::semantic_unit::{Certainty, SuType};

/// An atomic, self-contained statement derived from exactly one semantic
/// unit. Created in Stage 2; mutable only in its lifecycle fields
/// (`activation_count`, `coherence_score`, `is_weak`, `weakness_reason`,
/// `last_accessed`) — content and embedding never change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposition {
    pub id: uuid::Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    pub su_type: SuType,
    pub certainty: Certainty,
    pub concepts: Vec<String>,
    pub su_id: String,
    pub source_message_id: String,
    pub speaker: String,
    pub timestamp: DateTime<Utc>,
    pub block_metadata: BlockMetadata,

    pub activation_count: u32,
    pub coherence_score: f32,
    pub is_weak: bool,
    pub weakness_reason: Option<String>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposition {
    pub const DEFAULT_COHERENCE_SCORE: f32 = 0.5;
}

/// Directed edge: `from_id` was committed before `to_id` within one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextEdge {
    pub from_id: uuid::Uuid,
    pub to_id: uuid::Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCreator {
    Extraction,
    SleepCycle,
}

/// Undirected edge recording embedding similarity between two propositions.
/// The pair `(a_id, b_id)` is stored in a canonical order (smaller UUID
/// first) so MERGE-style upserts are order-independent, matching the
/// "idempotent under replay" law.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoherentEdge {
    pub a_id: uuid::Uuid,
    pub b_id: uuid::Uuid,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
    pub created_by: EdgeCreator,
    pub coactivation_count: u32,
    pub last_strengthened: Option<DateTime<Utc>>,
}

impl CoherentEdge {
    /// Canonical (a, b) ordering for an unordered pair so both creation
    /// orders MERGE onto the same stored edge.
    pub fn canonical_pair(x: uuid::Uuid, y: uuid::Uuid) -> (uuid::Uuid, uuid::Uuid) {
        if x <= y { (x, y) } else { (y, x) }
    }
}
