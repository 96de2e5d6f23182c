//! Drives one chat turn through the fixed stage sequence: two Stage 1
//! extractions, two Stage 2 propositionalizations, embedding, storage, and
//! edge creation, and always emits a summary result rather than throwing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mnemo_archive::ArchiveStore;
use mnemo_config::PipelineConfig;
use mnemo_graph::GraphStore;
use mnemo_llm::LlmCompletion;
use mnemo_model::{BlockMetadata, Certainty, ExtractionError, Message, NarrativeRole, SemanticUnit, SuType};
use mnemo_prompt::HistoryItem;
use mnemo_thinker::{extract_assistant_su, extract_reasoning_su, extract_user_su, propositionalize, ProtoProposition};
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::storage::{create_edges, store_propositions};

/// Input to one `Orchestrator::run` call. `assistant_reasoning` is read
/// under both extraction versions — folded into the Stage 1 prompt under
/// v1, extracted as its own semantic unit under v2.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub user_message: Message,
    pub assistant_message: Message,
    pub assistant_reasoning: Option<String>,
    pub conversation_history: Vec<HistoryItem>,
}

/// Elapsed time for one named pipeline stage, in commit order. A stage that
/// short-circuited because its required input was empty still contributes
/// an entry with `elapsed` at or near zero.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: &'static str,
    pub elapsed: Duration,
}

/// Always produced, even on partial failure — `error` carries the first
/// failure point's message when one occurred, per §4.1's "never thrown"
/// contract.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub user_su: SemanticUnit,
    pub secondary_su: SemanticUnit,
    pub user_proposition_count: usize,
    pub secondary_proposition_count: usize,
    pub stored_proposition_ids: Vec<Uuid>,
    pub stage_timings: Vec<StageTiming>,
    pub error: Option<String>,
}

pub struct Orchestrator {
    llm: Arc<dyn LlmCompletion>,
    embeddings: Arc<dyn EmbeddingProvider>,
    graph: Arc<GraphStore>,
    archive: Arc<ArchiveStore>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmCompletion>, embeddings: Arc<dyn EmbeddingProvider>, graph: Arc<GraphStore>, archive: Arc<ArchiveStore>, config: PipelineConfig) -> Self {
        Self { llm, embeddings, graph, archive, config }
    }

    pub async fn run(&self, batch: BatchInput) -> BatchResult {
        if self.config.llm.is_v2() {
            self.run_v2(batch).await
        } else {
            self.run_v1(batch).await
        }
    }

    async fn run_v1(&self, batch: BatchInput) -> BatchResult {
        let mut timings = Vec::with_capacity(7);
        let mut first_error: Option<String> = None;

        let (user_su, elapsed) = time(|| extract_user_su(self.llm.as_ref(), &batch.conversation_history, &batch.user_message)).await;
        timings.push(StageTiming { stage: "stage1_user", elapsed });
        let user_su = self.settle(user_su, &batch.user_message.message_id, &batch.user_message.message_id, "user", batch.user_message.timestamp, &mut first_error);

        let (assistant_su, elapsed) = time(|| {
            extract_assistant_su(
                self.llm.as_ref(),
                &batch.conversation_history,
                &batch.user_message,
                &batch.assistant_message,
                batch.assistant_reasoning.as_deref(),
            )
        })
        .await;
        timings.push(StageTiming { stage: "stage1_assistant", elapsed });
        let assistant_su = self.settle(assistant_su, &batch.assistant_message.message_id, &batch.assistant_message.message_id, "assistant", batch.assistant_message.timestamp, &mut first_error);

        let (user_props, elapsed) = time(|| propositionalize(self.llm.as_ref(), &user_su)).await;
        timings.push(StageTiming { stage: "stage2_user", elapsed });
        let user_props = self.settle_props(user_props, &mut first_error);

        let (assistant_props, elapsed) = time(|| propositionalize(self.llm.as_ref(), &assistant_su)).await;
        timings.push(StageTiming { stage: "stage2_assistant", elapsed });
        let assistant_props = self.settle_props(assistant_props, &mut first_error);

        self.finish(batch, user_su, assistant_su, user_props, assistant_props, timings, first_error).await
    }

    async fn run_v2(&self, batch: BatchInput) -> BatchResult {
        let mut timings = Vec::with_capacity(7);
        let mut first_error: Option<String> = None;

        let (user_su, elapsed) = time(|| extract_user_su(self.llm.as_ref(), &batch.conversation_history, &batch.user_message)).await;
        timings.push(StageTiming { stage: "stage1_user", elapsed });
        let user_su = self.settle(user_su, &batch.user_message.message_id, &batch.user_message.message_id, "user", batch.user_message.timestamp, &mut first_error);

        let reasoning_unit_id = format!("{}_reasoning", batch.assistant_message.message_id);
        let reasoning_message_id = reasoning_unit_id.clone();
        let (reasoning_su, elapsed) = time(|| {
            extract_reasoning_su(
                self.llm.as_ref(),
                &batch.conversation_history,
                &batch.user_message,
                &reasoning_unit_id,
                &reasoning_message_id,
                batch.assistant_message.timestamp,
                batch.assistant_reasoning.as_deref(),
            )
        })
        .await;
        timings.push(StageTiming { stage: "stage1_reasoning", elapsed });
        let reasoning_su = self.settle(reasoning_su, &reasoning_unit_id, &reasoning_message_id, "assistant_reasoning", batch.assistant_message.timestamp, &mut first_error);

        let (user_props, elapsed) = time(|| propositionalize(self.llm.as_ref(), &user_su)).await;
        timings.push(StageTiming { stage: "stage2_user", elapsed });
        let user_props = self.settle_props(user_props, &mut first_error);

        let (reasoning_props, elapsed) = time(|| propositionalize(self.llm.as_ref(), &reasoning_su)).await;
        timings.push(StageTiming { stage: "stage2_reasoning", elapsed });
        let reasoning_props = self.settle_props(reasoning_props, &mut first_error);

        self.finish(batch, user_su, reasoning_su, user_props, reasoning_props, timings, first_error).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        batch: BatchInput,
        user_su: SemanticUnit,
        secondary_su: SemanticUnit,
        user_props: Vec<ProtoProposition>,
        secondary_props: Vec<ProtoProposition>,
        mut timings: Vec<StageTiming>,
        mut first_error: Option<String>,
    ) -> BatchResult {
        let user_count = user_props.len();
        let secondary_count = secondary_props.len();

        let mut combined = user_props;
        combined.extend(secondary_props);
        let contents: Vec<String> = combined.iter().map(|p| p.content.clone()).collect();

        let (embeddings, elapsed) = time(|| self.embeddings.embed_batch(&contents)).await;
        timings.push(StageTiming { stage: "embedding", elapsed });
        let expected_dimensions = self.config.embedding.dimensions;
        let embeddings = match embeddings {
            Ok(vectors) if vectors.iter().any(|v| v.len() != expected_dimensions) => {
                first_error.get_or_insert_with(|| {
                    ExtractionError::SchemaValidation { message: format!("embedding batch returned a vector whose length differs from the configured {expected_dimensions} dimensions") }.to_string()
                });
                Vec::new()
            }
            Ok(vectors) => vectors,
            Err(err) => {
                first_error.get_or_insert_with(|| err.to_string());
                Vec::new()
            }
        };

        let now = Utc::now();
        // Present under both versions: folded into the v1 assistant prompt
        // above, or archived here as the synthetic reasoning message row
        // under v2 (§4.1 V2; the assistant message itself is never
        // extracted under v2, only archived raw via `assistant_message`).
        let reasoning_for_archive = batch.assistant_reasoning.as_deref();

        let (stored, elapsed) = time(|| {
            store_propositions(
                &self.archive,
                &self.graph,
                &batch.user_message,
                &batch.assistant_message,
                reasoning_for_archive,
                &user_su,
                &secondary_su,
                combined,
                embeddings,
                now,
            )
        })
        .await;
        timings.push(StageTiming { stage: "storage", elapsed });
        let stored = match stored {
            Ok(stored) => stored,
            Err(err) => {
                first_error.get_or_insert_with(|| err.to_string());
                Vec::new()
            }
        };

        let graph = Arc::clone(&self.graph);
        let top_k = self.config.graph.top_k_neighbors;
        let threshold = self.config.graph.similarity_threshold;
        let stored_for_edges = stored.clone();
        let start = Instant::now();
        let edges_result = tokio::task::spawn_blocking(move || create_edges(&graph, &stored_for_edges, top_k, threshold, now))
            .await
            .unwrap_or_else(|join_err| Err(ExtractionError::StoreTransport { message: format!("create_edges task panicked: {join_err}") }));
        timings.push(StageTiming { stage: "edge_creation", elapsed: start.elapsed() });
        if let Err(err) = edges_result {
            first_error.get_or_insert_with(|| err.to_string());
        }

        BatchResult {
            user_su,
            secondary_su,
            user_proposition_count: user_count,
            secondary_proposition_count: secondary_count,
            stored_proposition_ids: stored.into_iter().map(|(id, _)| id).collect(),
            stage_timings: timings,
            error: first_error,
        }
    }

    /// Converts a Stage 1 extraction error into the empty-SU degraded
    /// output §4.3 requires, recording the first error seen.
    fn settle(&self, result: Result<SemanticUnit, ExtractionError>, unit_id: &str, message_id: &str, speaker: &str, timestamp: DateTime<Utc>, first_error: &mut Option<String>) -> SemanticUnit {
        match result {
            Ok(su) => su,
            Err(err) => {
                first_error.get_or_insert_with(|| err.to_string());
                failed_su(unit_id, message_id, speaker, timestamp)
            }
        }
    }

    /// A Stage 2 error yields an empty proposition list rather than
    /// fabricating output — the orchestrator still proceeds to embedding
    /// and storage with whatever the other half produced.
    fn settle_props(&self, result: Result<Vec<ProtoProposition>, ExtractionError>, first_error: &mut Option<String>) -> Vec<ProtoProposition> {
        match result {
            Ok(props) => props,
            Err(err) => {
                first_error.get_or_insert_with(|| err.to_string());
                Vec::new()
            }
        }
    }
}

async fn time<F, Fut, T>(op: F) -> (T, Duration)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let value = op().await;
    (value, start.elapsed())
}

fn failed_su(unit_id: &str, message_id: &str, speaker: &str, timestamp: DateTime<Utc>) -> SemanticUnit {
    SemanticUnit {
        unit_id: unit_id.to_string(),
        message_id: message_id.to_string(),
        content: String::new(),
        speaker: speaker.to_string(),
        timestamp,
        su_type: SuType::Other,
        narrative_role: NarrativeRole::Peripheral,
        certainty: Certainty::Low,
        concepts: Vec::new(),
        block_metadata: BlockMetadata::default(),
        entities: Vec::new(),
        decisions: Vec::new(),
        context_dependencies: Vec::new(),
        impact: None,
        relevance: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use async_trait::async_trait;
    use mnemo_model::Role;
    use std::sync::Mutex;

    struct StubLlm {
        responses: Mutex<Vec<Result<String, ExtractionError>>>,
    }

    impl StubLlm {
        fn sequence(responses: Vec<Result<String, ExtractionError>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self { responses: Mutex::new(responses) }
        }
    }

    #[async_trait]
    impl LlmCompletion for StubLlm {
        async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, ExtractionError> {
            self.responses.lock().unwrap().pop().unwrap_or_else(|| Err(ExtractionError::LLMTransport { message: "no stubbed response left".to_string() }))
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError> {
            Ok(texts.iter().enumerate().map(|(i, _)| vec![i as f32 + 1.0, 0.0]).collect())
        }
    }

    fn sample_batch() -> BatchInput {
        let now = Utc::now();
        BatchInput {
            user_message: Message { message_id: "u1".to_string(), role: Role::User, content: "I like redb".to_string(), timestamp: now },
            assistant_message: Message { message_id: "a1".to_string(), role: Role::Assistant, content: "Great choice".to_string(), timestamp: now },
            assistant_reasoning: None,
            conversation_history: vec![],
        }
    }

    fn su_json(unit_id: &str) -> String {
        format!(
            r#"{{"unit_id":"{unit_id}","message_id":"{unit_id}","content":"some content","speaker":"user","timestamp":"2026-01-01T00:00:00Z","type":"statement","narrative_role":"core","certainty":"high","concepts":["storage"]}}"#
        )
    }

    fn props_json() -> String {
        r#"[{"su_id":"x","content":"fact one","type":"statement","certainty":"high","concepts":["storage"]}]"#.to_string()
    }

    #[tokio::test]
    async fn v1_happy_path_produces_no_error_and_stores_propositions() {
        let llm = StubLlm::sequence(vec![Ok(su_json("u1")), Ok(su_json("a1")), Ok(props_json()), Ok(props_json())]);
        let archive = ArchiveStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let graph = GraphStore::open(dir.path().join("g.redb")).unwrap();
        let mut config = PipelineConfig::default();
        config.embedding.dimensions = 2;

        let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(StubEmbedder), Arc::new(graph), Arc::new(archive), config);
        let result = orchestrator.run(sample_batch()).await;

        assert!(result.error.is_none());
        assert_eq!(result.user_proposition_count, 1);
        assert_eq!(result.secondary_proposition_count, 1);
        assert_eq!(result.stored_proposition_ids.len(), 2);
    }

    #[tokio::test]
    async fn stage1_failure_degrades_to_empty_su_and_records_first_error() {
        let llm = StubLlm::sequence(vec![Err(ExtractionError::llm_output("not json")), Ok(su_json("a1")), Ok(props_json())]);
        let archive = ArchiveStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let graph = GraphStore::open(dir.path().join("g.redb")).unwrap();

        let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(StubEmbedder), Arc::new(graph), Arc::new(archive), PipelineConfig::default());
        let result = orchestrator.run(sample_batch()).await;

        assert!(result.error.is_some());
        assert!(result.user_su.content.is_empty());
        assert_eq!(result.user_proposition_count, 0);
    }

    #[tokio::test]
    async fn v2_with_missing_reasoning_uses_placeholder_without_an_llm_call() {
        let mut config = PipelineConfig::default();
        config.llm.extraction_version = "v2".to_string();
        config.embedding.dimensions = 2;
        let llm = StubLlm::sequence(vec![Ok(su_json("u1")), Ok(props_json()), Ok(props_json())]);
        let archive = ArchiveStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let graph = GraphStore::open(dir.path().join("g.redb")).unwrap();

        let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(StubEmbedder), Arc::new(graph), Arc::new(archive), config);
        let result = orchestrator.run(sample_batch()).await;

        assert_eq!(result.secondary_su.content, "No reasoning provided");
        assert!(result.error.is_none());
    }
}
