//! The embedded graph store: propositions, temporal (NEXT) edges, and
//! semantic (COHERENT) edges, backed by `redb`. Fulfils §4.6's contract —
//! uniqueness, idempotent MERGE-style edge upserts, an exhaustive-scan
//! vector index — without a network graph database, since none is assumed
//! to be running in this crate's test or CLI environment.

use std::path::Path;

use chrono::{DateTime, Utc};
use mnemo_model::{CoherentEdge, EdgeCreator, ExtractionError, NextEdge, Proposition};
use redb::{Database, ReadableTable, ReadableTableMetadata};
use uuid::Uuid;

use crate::schema::{coherent_edge_key, next_edge_key, COHERENT_EDGES_TABLE, NEXT_EDGES_TABLE, PROPOSITIONS_TABLE};
use crate::vector::cosine_similarity;

/// One hit from [`GraphStore::vector_search`], ordered by descending
/// similarity.
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    pub id: Uuid,
    pub content: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct SemanticNeighbor {
    pub id: Uuid,
    pub weight: f32,
}

/// Patch applied by [`GraphStore::update_proposition`] — lifecycle fields
/// only; `content`/`embedding`/etc. are immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct PropositionPatch {
    pub activation_count: Option<u32>,
    pub coherence_score: Option<f32>,
    pub is_weak: Option<bool>,
    pub weakness_reason: Option<Option<String>>,
    pub last_accessed: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeCounts {
    pub next: u64,
    pub coherent: u64,
}

pub struct GraphStore {
    db: Database,
}

impl GraphStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractionError::StoreTransport { message: format!("creating graph store directory: {e}") })?;
        }
        let db = Database::create(path).map_err(|e| ExtractionError::StoreTransport { message: format!("opening graph store at {}: {e}", path.display()) })?;

        let tx = db.begin_write().map_err(tx_err)?;
        tx.open_table(PROPOSITIONS_TABLE).map_err(table_err)?;
        tx.open_table(NEXT_EDGES_TABLE).map_err(table_err)?;
        tx.open_table(COHERENT_EDGES_TABLE).map_err(table_err)?;
        tx.commit().map_err(tx_err)?;

        Ok(Self { db })
    }

    /// Inserts a new proposition, minting an id if `proposition.id` is nil
    /// and always stamping `created_at`/`updated_at` to `now` and resetting
    /// lifecycle fields to their defaults regardless of what the caller
    /// passed in — Stage 2 output never carries lifecycle state (§4.6).
    pub fn create_proposition(&self, mut proposition: Proposition, now: DateTime<Utc>) -> Result<Proposition, ExtractionError> {
        if proposition.id.is_nil() {
            proposition.id = Uuid::new_v4();
        }
        proposition.created_at = now;
        proposition.updated_at = now;
        proposition.activation_count = 0;
        proposition.coherence_score = Proposition::DEFAULT_COHERENCE_SCORE;
        proposition.is_weak = false;
        proposition.weakness_reason = None;
        proposition.last_accessed = None;

        let bytes = serde_json::to_vec(&proposition).map_err(serde_err)?;
        let key = proposition.id.to_string();

        let tx = self.db.begin_write().map_err(tx_err)?;
        {
            let mut table = tx.open_table(PROPOSITIONS_TABLE).map_err(table_err)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(table_err)?;
        }
        tx.commit().map_err(tx_err)?;
        Ok(proposition)
    }

    pub fn get_proposition(&self, id: Uuid) -> Result<Option<Proposition>, ExtractionError> {
        let tx = self.db.begin_read().map_err(tx_err)?;
        let table = tx.open_table(PROPOSITIONS_TABLE).map_err(table_err)?;
        match table.get(id.to_string().as_str()).map_err(table_err)? {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_slice(value.value()).map_err(serde_err)?)),
        }
    }

    /// Patches lifecycle fields only and bumps `updated_at`.
    pub fn update_proposition(&self, id: Uuid, patch: PropositionPatch, now: DateTime<Utc>) -> Result<(), ExtractionError> {
        let mut proposition = self
            .get_proposition(id)?
            .ok_or_else(|| ExtractionError::InvariantViolation { message: format!("update_proposition: no such proposition {id}") })?;

        if let Some(v) = patch.activation_count {
            proposition.activation_count = v;
        }
        if let Some(v) = patch.coherence_score {
            proposition.coherence_score = v;
        }
        if let Some(v) = patch.is_weak {
            proposition.is_weak = v;
        }
        if let Some(v) = patch.weakness_reason {
            proposition.weakness_reason = v;
        }
        if let Some(v) = patch.last_accessed {
            proposition.last_accessed = v;
        }
        proposition.updated_at = now;

        let bytes = serde_json::to_vec(&proposition).map_err(serde_err)?;
        let tx = self.db.begin_write().map_err(tx_err)?;
        {
            let mut table = tx.open_table(PROPOSITIONS_TABLE).map_err(table_err)?;
            table.insert(id.to_string().as_str(), bytes.as_slice()).map_err(table_err)?;
        }
        tx.commit().map_err(tx_err)?;
        Ok(())
    }

    /// MERGE-semantics: idempotent. A repeated call with the same `(from,
    /// to)` pair is a no-op — the original `created_at` is preserved.
    pub fn create_temporal_edge(&self, from: Uuid, to: Uuid, now: DateTime<Utc>) -> Result<(), ExtractionError> {
        let key = next_edge_key(from, to);
        let tx = self.db.begin_write().map_err(tx_err)?;
        {
            let mut table = tx.open_table(NEXT_EDGES_TABLE).map_err(table_err)?;
            if table.get(key.as_str()).map_err(table_err)?.is_some() {
                return Ok(());
            }
            let edge = NextEdge { from_id: from, to_id: to, created_at: now };
            let bytes = serde_json::to_vec(&edge).map_err(serde_err)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(table_err)?;
        }
        tx.commit().map_err(tx_err)?;
        Ok(())
    }

    /// MERGE-semantics on the undirected pair. Self-edges are rejected
    /// (§4.6 determinism). `coactivation_count` defaults to 0 on first
    /// creation and is preserved (not reset) on subsequent calls.
    pub fn create_semantic_edge(&self, a: Uuid, b: Uuid, weight: f32, created_by: EdgeCreator, now: DateTime<Utc>) -> Result<(), ExtractionError> {
        if a == b {
            return Err(ExtractionError::InvariantViolation { message: format!("create_semantic_edge: self-edge rejected for {a}") });
        }
        let (a, b) = CoherentEdge::canonical_pair(a, b);
        let key = coherent_edge_key(a, b);

        let tx = self.db.begin_write().map_err(tx_err)?;
        {
            let mut table = tx.open_table(COHERENT_EDGES_TABLE).map_err(table_err)?;
            let existing: Option<CoherentEdge> = match table.get(key.as_str()).map_err(table_err)? {
                Some(value) => Some(serde_json::from_slice(value.value()).map_err(serde_err)?),
                None => None,
            };
            let edge = match existing {
                Some(mut e) => {
                    e.weight = weight;
                    e.last_strengthened = Some(now);
                    e
                }
                None => CoherentEdge { a_id: a, b_id: b, weight, created_at: now, created_by, coactivation_count: 0, last_strengthened: None },
            };
            let bytes = serde_json::to_vec(&edge).map_err(serde_err)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(table_err)?;
        }
        tx.commit().map_err(tx_err)?;
        Ok(())
    }

    /// Top-k propositions by cosine similarity to `query`, filtered to
    /// `similarity >= min_similarity`, descending. Correct but O(n) in the
    /// proposition count — acceptable at this crate's target scale (§4.6
    /// expansion).
    pub fn vector_search(&self, query: &[f32], k: usize, min_similarity: f32) -> Result<Vec<VectorSearchResult>, ExtractionError> {
        let tx = self.db.begin_read().map_err(tx_err)?;
        let table = tx.open_table(PROPOSITIONS_TABLE).map_err(table_err)?;

        let mut scored = Vec::new();
        for entry in table.iter().map_err(table_err)? {
            let (_, value) = entry.map_err(table_err)?;
            let proposition: Proposition = serde_json::from_slice(value.value()).map_err(serde_err)?;
            let similarity = cosine_similarity(&proposition.embedding, query);
            if similarity >= min_similarity {
                scored.push(VectorSearchResult { id: proposition.id, content: proposition.content, similarity });
            }
        }
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn count_propositions(&self) -> Result<u64, ExtractionError> {
        let tx = self.db.begin_read().map_err(tx_err)?;
        let table = tx.open_table(PROPOSITIONS_TABLE).map_err(table_err)?;
        table.len().map_err(table_err)
    }

    pub fn count_edges(&self) -> Result<EdgeCounts, ExtractionError> {
        let tx = self.db.begin_read().map_err(tx_err)?;
        let next_table = tx.open_table(NEXT_EDGES_TABLE).map_err(table_err)?;
        let coherent_table = tx.open_table(COHERENT_EDGES_TABLE).map_err(table_err)?;
        Ok(EdgeCounts { next: next_table.len().map_err(table_err)?, coherent: coherent_table.len().map_err(table_err)? })
    }

    pub fn get_semantic_neighbors(&self, id: Uuid, min_weight: f32) -> Result<Vec<SemanticNeighbor>, ExtractionError> {
        let tx = self.db.begin_read().map_err(tx_err)?;
        let table = tx.open_table(COHERENT_EDGES_TABLE).map_err(table_err)?;

        let mut neighbors = Vec::new();
        for entry in table.iter().map_err(table_err)? {
            let (_, value) = entry.map_err(table_err)?;
            let edge: CoherentEdge = serde_json::from_slice(value.value()).map_err(serde_err)?;
            if edge.weight < min_weight {
                continue;
            }
            if edge.a_id == id {
                neighbors.push(SemanticNeighbor { id: edge.b_id, weight: edge.weight });
            } else if edge.b_id == id {
                neighbors.push(SemanticNeighbor { id: edge.a_id, weight: edge.weight });
            }
        }
        Ok(neighbors)
    }

    pub fn get_all_propositions(&self, limit: usize) -> Result<Vec<Proposition>, ExtractionError> {
        let tx = self.db.begin_read().map_err(tx_err)?;
        let table = tx.open_table(PROPOSITIONS_TABLE).map_err(table_err)?;

        let mut props = Vec::new();
        for entry in table.iter().map_err(table_err)? {
            if props.len() >= limit {
                break;
            }
            let (_, value) = entry.map_err(table_err)?;
            props.push(serde_json::from_slice(value.value()).map_err(serde_err)?);
        }
        Ok(props)
    }

    pub fn get_temporal_chain(&self) -> Result<Vec<NextEdge>, ExtractionError> {
        let tx = self.db.begin_read().map_err(tx_err)?;
        let table = tx.open_table(NEXT_EDGES_TABLE).map_err(table_err)?;

        let mut edges = Vec::new();
        for entry in table.iter().map_err(table_err)? {
            let (_, value) = entry.map_err(table_err)?;
            edges.push(serde_json::from_slice::<NextEdge>(value.value()).map_err(serde_err)?);
        }
        edges.sort_by_key(|e| e.created_at);
        Ok(edges)
    }
}

fn tx_err<E: std::fmt::Display>(e: E) -> ExtractionError {
    ExtractionError::StoreTransport { message: format!("graph store transaction error: {e}") }
}

fn table_err<E: std::fmt::Display>(e: E) -> ExtractionError {
    ExtractionError::StoreTransport { message: format!("graph store table error: {e}") }
}

fn serde_err(e: serde_json::Error) -> ExtractionError {
    ExtractionError::StoreTransport { message: format!("graph store serialization error: {e}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_model::{BlockMetadata, Certainty, SuType};

    fn sample_proposition(id: Uuid, content: &str, embedding: Vec<f32>) -> Proposition {
        let now = Utc::now();
        Proposition {
            id,
            content: content.to_string(),
            embedding,
            su_type: SuType::Statement,
            certainty: Certainty::High,
            concepts: vec!["test".to_string()],
            su_id: "su-1".to_string(),
            source_message_id: "m-1".to_string(),
            speaker: "user".to_string(),
            timestamp: now,
            block_metadata: BlockMetadata::default(),
            activation_count: 7,
            coherence_score: 0.9,
            is_weak: true,
            weakness_reason: Some("stale".to_string()),
            last_accessed: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn open_store() -> (GraphStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn create_proposition_mints_id_and_resets_lifecycle_fields() {
        let (store, _dir) = open_store();
        let draft = sample_proposition(Uuid::nil(), "hello", vec![1.0, 0.0]);
        let stored = store.create_proposition(draft, Utc::now()).unwrap();

        assert!(!stored.id.is_nil());
        assert_eq!(stored.activation_count, 0);
        assert_eq!(stored.coherence_score, Proposition::DEFAULT_COHERENCE_SCORE);
        assert!(!stored.is_weak);
        assert!(stored.weakness_reason.is_none());
    }

    #[test]
    fn update_proposition_patches_lifecycle_only() {
        let (store, _dir) = open_store();
        let id = Uuid::new_v4();
        let draft = sample_proposition(id, "hello", vec![1.0, 0.0]);
        let stored = store.create_proposition(draft, Utc::now()).unwrap();

        store
            .update_proposition(stored.id, PropositionPatch { activation_count: Some(3), is_weak: Some(true), ..Default::default() }, Utc::now())
            .unwrap();

        let updated = store.get_proposition(stored.id).unwrap().unwrap();
        assert_eq!(updated.activation_count, 3);
        assert!(updated.is_weak);
        assert_eq!(updated.content, "hello");
    }

    #[test]
    fn temporal_edge_creation_is_idempotent() {
        let (store, _dir) = open_store();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let t1 = Utc::now();
        store.create_temporal_edge(a, b, t1).unwrap();
        store.create_temporal_edge(a, b, t1 + chrono::Duration::seconds(5)).unwrap();

        let chain = store.get_temporal_chain().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].created_at, t1);
    }

    #[test]
    fn semantic_self_edge_is_rejected() {
        let (store, _dir) = open_store();
        let a = Uuid::new_v4();
        let err = store.create_semantic_edge(a, a, 0.9, EdgeCreator::Extraction, Utc::now()).unwrap_err();
        assert!(matches!(err, ExtractionError::InvariantViolation { .. }));
    }

    #[test]
    fn semantic_edge_is_order_independent_and_refreshes_weight() {
        let (store, _dir) = open_store();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.create_semantic_edge(a, b, 0.5, EdgeCreator::Extraction, Utc::now()).unwrap();
        store.create_semantic_edge(b, a, 0.8, EdgeCreator::Extraction, Utc::now()).unwrap();

        let neighbors_a = store.get_semantic_neighbors(a, 0.0).unwrap();
        assert_eq!(neighbors_a.len(), 1);
        assert_eq!(neighbors_a[0].id, b);
        assert_eq!(neighbors_a[0].weight, 0.8);

        let counts = store.count_edges().unwrap();
        assert_eq!(counts.coherent, 1);
    }

    #[test]
    fn vector_search_excludes_the_source_and_respects_threshold() {
        let (store, _dir) = open_store();
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let id_c = Uuid::new_v4();
        store.create_proposition(sample_proposition(id_a, "a", vec![1.0, 0.0]), Utc::now()).unwrap();
        store.create_proposition(sample_proposition(id_b, "b", vec![1.0, 0.0]), Utc::now()).unwrap();
        store.create_proposition(sample_proposition(id_c, "c", vec![0.0, 1.0]), Utc::now()).unwrap();

        let results = store.vector_search(&[1.0, 0.0], 10, 0.4).unwrap();
        let ids: Vec<Uuid> = results.iter().map(|r| r.id).collect();
        assert!(ids.contains(&id_a));
        assert!(ids.contains(&id_b));
        assert!(!ids.contains(&id_c));
    }
}
