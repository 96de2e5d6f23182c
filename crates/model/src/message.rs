use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message. `AssistantReasoning` is a synthetic role used
/// when a model's chain-of-thought is archived alongside its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    AssistantReasoning,
}

/// A raw chat utterance. Immutable once created; lives in the archive only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
