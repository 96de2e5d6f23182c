//! Wires the per-turn extraction pipeline together: the embedding service,
//! the stage orchestrator, and a bounded worker pool over it.

mod embedding;
mod orchestrator;
mod storage;
mod worker;

pub use embedding::{EmbeddingProvider, OllamaEmbeddingProvider};
pub use orchestrator::{BatchInput, BatchResult, Orchestrator, StageTiming};
pub use storage::{create_edges, store_propositions, StoredProposition};
pub use worker::{WorkerPool, WorkerPoolClosed};
