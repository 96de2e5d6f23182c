use chrono::{DateTime, Utc};
use mnemo_model::{BlockMetadata, Certainty, SuType};

/// A proposition before it has an embedding or a minted id. Stage 2 produces
/// these; Stage 3 (embedding) and the storage stage (which mints the graph
/// store's `id`) jointly turn a `ProtoProposition` plus its embedding vector
/// into a full `mnemo_model::Proposition`.
///
/// Keeping this as its own type rather than passing a loosely-typed map
/// through the later stages makes the "no id or embedding yet" state
/// impossible to confuse with a fully committed `Proposition` at compile
/// time.
#[derive(Debug, Clone)]
pub struct ProtoProposition {
    pub su_id: String,
    pub content: String,
    pub su_type: SuType,
    pub certainty: Certainty,
    pub concepts: Vec<String>,
    pub block_metadata: BlockMetadata,
    pub source_message_id: String,
    pub speaker: String,
    pub timestamp: DateTime<Utc>,
}

impl ProtoProposition {
    /// Combines this proto-proposition with its embedding vector and a
    /// server-minted id into a full, storable `Proposition`, initializing
    /// all lifecycle fields to their defaults (§3, §4.6).
    pub fn into_proposition(self, id: uuid::Uuid, embedding: Vec<f32>, now: DateTime<Utc>) -> mnemo_model::Proposition {
        mnemo_model::Proposition {
            id,
            content: self.content,
            embedding,
            su_type: self.su_type,
            certainty: self.certainty,
            concepts: self.concepts,
            su_id: self.su_id,
            source_message_id: self.source_message_id,
            speaker: self.speaker,
            timestamp: self.timestamp,
            block_metadata: self.block_metadata,
            activation_count: 0,
            coherence_score: mnemo_model::Proposition::DEFAULT_COHERENCE_SCORE,
            is_weak: false,
            weakness_reason: None,
            last_accessed: None,
            created_at: now,
            updated_at: now,
        }
    }
}
