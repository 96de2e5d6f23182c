//! End-to-end scenarios over the full `Orchestrator::run` path: a real
//! `redb` graph store and an in-memory `rusqlite` archive behind stub
//! LLM/embedding providers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use mnemo_archive::ArchiveStore;
use mnemo_config::PipelineConfig;
use mnemo_graph::GraphStore;
use mnemo_llm::LlmCompletion;
use mnemo_model::{ExtractionError, Message, Role};
use mnemo_pipeline::{BatchInput, EmbeddingProvider, Orchestrator};

struct ScriptedLlm {
    responses: Mutex<Vec<Result<String, ExtractionError>>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<Result<String, ExtractionError>>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self { responses: Mutex::new(responses) }
    }
}

#[async_trait]
impl LlmCompletion for ScriptedLlm {
    async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, ExtractionError> {
        self.responses.lock().unwrap().pop().unwrap_or_else(|| Err(ExtractionError::LLMTransport { message: "scripted responses exhausted".to_string() }))
    }
}

/// Produces orthogonal unit vectors by default, so neighbor searches are
/// deterministic. Texts named in `shared` are pinned to the same direction,
/// so propositions built from them land as near-neighbors of one another.
struct AxisEmbedder {
    shared: Vec<String>,
}

impl AxisEmbedder {
    fn new() -> Self {
        Self { shared: Vec::new() }
    }

    fn with_shared_direction(texts: &[&str]) -> Self {
        Self { shared: texts.iter().map(|t| t.to_string()).collect() }
    }
}

#[async_trait]
impl EmbeddingProvider for AxisEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                if self.shared.iter().any(|s| s == text) {
                    vec![1.0, 0.0, 0.0]
                } else {
                    let mut v = vec![0.0; 8];
                    v[i % 8] = 1.0;
                    v
                }
            })
            .collect())
    }
}

fn message(id: &str, role: Role, content: &str) -> Message {
    Message { message_id: id.to_string(), role, content: content.to_string(), timestamp: Utc::now() }
}

fn batch(user_id: &str, user_text: &str, assistant_id: &str, assistant_text: &str) -> BatchInput {
    BatchInput {
        user_message: message(user_id, Role::User, user_text),
        assistant_message: message(assistant_id, Role::Assistant, assistant_text),
        assistant_reasoning: None,
        conversation_history: vec![],
    }
}

fn su_json(unit_id: &str, message_id: &str, content: &str, su_type: &str, block_metadata: &str) -> String {
    format!(
        r#"{{"unit_id":"{unit_id}","message_id":"{message_id}","content":"{content}","speaker":"user","timestamp":"2026-01-01T00:00:00Z","type":"{su_type}","narrative_role":"core","certainty":"high","concepts":["storage"],"block_metadata":{block_metadata}}}"#
    )
}

fn props_json(entries: &[&str]) -> String {
    let items: Vec<String> = entries
        .iter()
        .map(|content| format!(r#"{{"su_id":"x","content":"{content}","type":"statement","certainty":"high","concepts":["storage"]}}"#))
        .collect();
    format!("[{}]", items.join(","))
}

fn new_graph_arc() -> (tempfile::TempDir, Arc<GraphStore>) {
    let dir = tempfile::tempdir().unwrap();
    let graph = GraphStore::open(dir.path().join("g.redb")).unwrap();
    (dir, Arc::new(graph))
}

/// Scenario 1: resource + decision capture. A Decision-typed semantic unit
/// carrying a non-empty `decision_reason` extracts cleanly and its
/// propositions inherit the parent SU's type/certainty/concepts verbatim
/// (the metadata-inheritance invariant, SPEC_FULL §4.4 and testable
/// property 5).
#[tokio::test]
async fn resource_and_decision_capture_inherits_metadata_from_the_parent_su() {
    let block_metadata = r#"{"decision_choice":"redb","decision_reason":"matches the existing embedded-store stack"}"#;
    let llm = ScriptedLlm::new(vec![
        Ok(su_json("u1", "m1", "the user decided to use redb", "decision", block_metadata)),
        Ok(su_json("a1", "m2", "the assistant agreed", "statement", "{}")),
        Ok(props_json(&["chose redb for the embedded graph store"])),
        Ok(props_json(&["agreed redb fits the constraints"])),
    ]);
    let archive = ArchiveStore::open_in_memory().unwrap();
    let (_dir, graph) = new_graph_arc();

    let mut config = PipelineConfig::default();
    config.embedding.dimensions = 8;
    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(AxisEmbedder::new()), graph, Arc::new(archive), config);
    let result = orchestrator.run(batch("m1", "should we use redb?", "m2", "yes, redb fits")).await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.user_su.block_metadata.decision_choice.as_deref(), Some("redb"));
    assert_eq!(result.user_su.block_metadata.decision_reason.as_deref(), Some("matches the existing embedded-store stack"));
    assert_eq!(result.stored_proposition_ids.len(), 2);
}

/// Scenario 2: greeting minimality. A bare greeting with nothing of
/// substance yields an SU with zero propositions on that side without the
/// turn failing — `create_edges` runs but adds nothing for the empty half.
#[tokio::test]
async fn greeting_minimality_produces_no_propositions_for_a_bare_greeting() {
    let llm = ScriptedLlm::new(vec![
        Ok(su_json("u1", "m1", "hi", "statement", "{}")),
        Ok(su_json("a1", "m2", "hello, how can I help?", "statement", "{}")),
        Ok(props_json(&[])),
        Ok(props_json(&["offered to help"])),
    ]);
    let archive = ArchiveStore::open_in_memory().unwrap();
    let (_dir, graph) = new_graph_arc();

    let mut config = PipelineConfig::default();
    config.embedding.dimensions = 8;
    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(AxisEmbedder::new()), graph, Arc::new(archive), config);
    let result = orchestrator.run(batch("m1", "hi", "m2", "hello, how can I help?")).await;

    assert!(result.error.is_none());
    assert_eq!(result.user_proposition_count, 0);
    assert_eq!(result.secondary_proposition_count, 1);
    assert_eq!(result.stored_proposition_ids.len(), 1);
}

/// Scenario 3: ordered NEXT chain. For `stored_proposition_ids = [p0..pn]`
/// there is a NEXT edge `p_i -> p_{i+1}` for every adjacent pair and no
/// others (testable property 4).
#[tokio::test]
async fn stored_propositions_form_an_ordered_next_chain() {
    let llm = ScriptedLlm::new(vec![
        Ok(su_json("u1", "m1", "three facts follow", "statement", "{}")),
        Ok(su_json("a1", "m2", "acknowledged", "statement", "{}")),
        Ok(props_json(&["fact one", "fact two"])),
        Ok(props_json(&["fact three"])),
    ]);
    let archive = ArchiveStore::open_in_memory().unwrap();
    let (_dir, graph) = new_graph_arc();
    let graph_handle = Arc::clone(&graph);

    let mut config = PipelineConfig::default();
    config.embedding.dimensions = 8;
    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(AxisEmbedder::new()), graph, Arc::new(archive), config);
    let result = orchestrator.run(batch("m1", "three facts", "m2", "ok")).await;

    assert!(result.error.is_none());
    assert_eq!(result.stored_proposition_ids.len(), 3);

    let chain = graph_handle.get_temporal_chain().unwrap();
    assert_eq!(chain.len(), 2);
    let ids = &result.stored_proposition_ids;
    assert!(chain.iter().any(|e| e.from_id == ids[0] && e.to_id == ids[1]));
    assert!(chain.iter().any(|e| e.from_id == ids[1] && e.to_id == ids[2]));
}

/// Scenario 4: vector neighborhood excludes self. Two propositions pinned
/// to the same embedding direction form a COHERENT edge between each
/// other, never to themselves (testable property 3).
#[tokio::test]
async fn vector_neighborhood_links_similar_propositions_and_excludes_self() {
    let llm = ScriptedLlm::new(vec![
        Ok(su_json("u1", "m1", "a redb fact", "statement", "{}")),
        Ok(su_json("a1", "m2", "another redb fact", "statement", "{}")),
        Ok(props_json(&["redb stores propositions"])),
        Ok(props_json(&["redb also stores edges"])),
    ]);
    let archive = ArchiveStore::open_in_memory().unwrap();
    let (_dir, graph) = new_graph_arc();
    let graph_handle = Arc::clone(&graph);
    let embedder = AxisEmbedder::with_shared_direction(&["redb stores propositions", "redb also stores edges"]);

    let mut config = PipelineConfig::default();
    config.graph.similarity_threshold = 0.5;
    config.embedding.dimensions = 3;
    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(embedder), graph, Arc::new(archive), config);
    let result = orchestrator.run(batch("m1", "a redb fact", "m2", "another redb fact")).await;

    assert!(result.error.is_none());
    let ids = &result.stored_proposition_ids;
    assert_eq!(ids.len(), 2);

    let neighbors = graph_handle.get_semantic_neighbors(ids[0], 0.0).unwrap();
    assert!(neighbors.iter().any(|n| n.id == ids[1]));
    assert!(neighbors.iter().all(|n| n.id != ids[0]));
}

/// Scenario 5: lineage across both stores. Every stored proposition's
/// lineage traces back to one of the turn's two messages and one of its
/// two semantic units (testable property 1).
#[tokio::test]
async fn lineage_traces_back_through_both_stores() {
    let llm = ScriptedLlm::new(vec![
        Ok(su_json("u1", "m1", "the user asked a question", "statement", "{}")),
        Ok(su_json("a1", "m2", "the assistant answered", "statement", "{}")),
        Ok(props_json(&["asked about redb"])),
        Ok(props_json(&["answered with redb details"])),
    ]);
    let archive = Arc::new(ArchiveStore::open_in_memory().unwrap());
    let (_dir, graph) = new_graph_arc();

    let mut config = PipelineConfig::default();
    config.embedding.dimensions = 8;
    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(AxisEmbedder::new()), graph, Arc::clone(&archive), config);
    let result = orchestrator.run(batch("m1", "a question", "m2", "an answer")).await;

    assert!(result.error.is_none());
    assert_eq!(result.stored_proposition_ids.len(), 2);

    for id in &result.stored_proposition_ids {
        let lineage = archive.get_full_lineage(*id).unwrap().expect("lineage must exist for a committed proposition");
        assert!(lineage.message.message_id == "m1" || lineage.message.message_id == "m2");
        assert!(lineage.semantic_unit.unit_id == result.user_su.unit_id || lineage.semantic_unit.unit_id == result.secondary_su.unit_id);
    }
}

/// Scenario 6: partial failure after Stage 1a. When the user-side Stage 1
/// extraction fails, the turn still completes with a degraded empty user
/// SU, the assistant side still extracts normally, and the first error is
/// surfaced rather than the whole turn aborting.
#[tokio::test]
async fn partial_failure_after_stage1_user_still_completes_the_turn() {
    let llm = ScriptedLlm::new(vec![
        Err(ExtractionError::llm_output("not json at all")),
        Ok(su_json("a1", "m2", "the assistant responded anyway", "statement", "{}")),
        Ok(props_json(&["responded regardless of the user-side failure"])),
    ]);
    let archive = ArchiveStore::open_in_memory().unwrap();
    let (_dir, graph) = new_graph_arc();

    let mut config = PipelineConfig::default();
    config.embedding.dimensions = 8;
    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(AxisEmbedder::new()), graph, Arc::new(archive), config);
    let result = orchestrator.run(batch("m1", "garbled input", "m2", "a fine response")).await;

    assert!(result.error.is_some());
    assert!(result.user_su.content.is_empty());
    assert_eq!(result.user_proposition_count, 0);
    assert_eq!(result.secondary_proposition_count, 1);
    assert_eq!(result.stored_proposition_ids.len(), 1);
}
