//! Pipeline configuration: nested `serde`-derived structs with literal
//! defaults, loaded from a TOML file and overlaid with environment variable
//! overrides using the same key names the config surface documents.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_max_messages: usize,
    pub timeout_secs: u64,
    /// `v1` runs the three-extraction variant (user / assistant / reasoning
    /// folded into the assistant prompt); `v2` runs the two-extraction
    /// variant (user facts / reasoning logic, assistant message stored raw).
    pub extraction_version: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b".to_string(),
            temperature: 0.3,
            max_tokens: 1500,
            context_max_messages: 2,
            timeout_secs: 30,
            extraction_version: "v1".to_string(),
        }
    }
}

impl LlmConfig {
    pub fn is_v2(&self) -> bool {
        self.extraction_version.eq_ignore_ascii_case("v2")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 1536,
            batch_size: 100,
            timeout_secs: 10,
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub similarity_threshold: f32,
    pub top_k_neighbors: usize,
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "data/mnemo_graph".to_string(),
            user: String::new(),
            password: String::new(),
            similarity_threshold: 0.4,
            top_k_neighbors: 10,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub path: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            path: "data/mnemo_archive.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub pool_size: usize,
    pub queue_capacity: usize,
    pub retry_max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            queue_capacity: 256,
            retry_max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub graph: GraphConfig,
    pub archive: ArchiveConfig,
    pub worker: WorkerConfig,
}

impl PipelineConfig {
    /// Loads defaults, overlays a TOML file if present and readable, then
    /// overlays environment variables named after the configuration surface
    /// (`LLM_MODEL`, `EMBEDDING_DIMENSIONS`, `GRAPH_URI`, ...).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = env::var("LLM_TEMPERATURE").and_then(|s| s.parse().map_err(|_| env::VarError::NotPresent)) {
            self.llm.temperature = v;
        }
        if let Ok(v) = env::var("LLM_MAX_TOKENS").ok().and_then(|s| s.parse().ok()) {
            self.llm.max_tokens = v;
        }
        if let Ok(v) = env::var("CONTEXT_MAX_MESSAGES").ok().and_then(|s| s.parse().ok()) {
            self.llm.context_max_messages = v;
        }
        if let Ok(v) = env::var("EXTRACTION_VERSION") {
            self.llm.extraction_version = v;
        }
        if let Ok(v) = env::var("LLM_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()) {
            self.llm.timeout_secs = v;
        }
        if let Ok(v) = env::var("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = env::var("EMBEDDING_DIMENSIONS").ok().and_then(|s| s.parse().ok()) {
            self.embedding.dimensions = v;
        }
        if let Ok(v) = env::var("EMBEDDING_BATCH_SIZE").ok().and_then(|s| s.parse().ok()) {
            self.embedding.batch_size = v;
        }
        if let Ok(v) = env::var("EMBEDDING_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()) {
            self.embedding.timeout_secs = v;
        }
        if let Ok(v) = env::var("GRAPH_URI") {
            self.graph.uri = v;
        }
        if let Ok(v) = env::var("GRAPH_USER") {
            self.graph.user = v;
        }
        if let Ok(v) = env::var("GRAPH_PASSWORD") {
            self.graph.password = v;
        }
        if let Ok(v) = env::var("SIMILARITY_THRESHOLD").ok().and_then(|s| s.parse().ok()) {
            self.graph.similarity_threshold = v;
        }
        if let Ok(v) = env::var("TOP_K_NEIGHBORS").ok().and_then(|s| s.parse().ok()) {
            self.graph.top_k_neighbors = v;
        }
        if let Ok(v) = env::var("STORE_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()) {
            self.graph.timeout_secs = v;
        }
        if let Ok(v) = env::var("ARCHIVE_PATH") {
            self.archive.path = v;
        }
        if let Ok(v) = env::var("WORKER_POOL_SIZE").ok().and_then(|s| s.parse().ok()) {
            self.worker.pool_size = v;
        }
        if let Ok(v) = env::var("WORKER_QUEUE_CAPACITY").ok().and_then(|s| s.parse().ok()) {
            self.worker.queue_capacity = v;
        }
        if let Ok(v) = env::var("RETRY_MAX_ATTEMPTS").ok().and_then(|s| s.parse().ok()) {
            self.worker.retry_max_attempts = v;
        }
    }
}
