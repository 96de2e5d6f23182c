//! On-disk JSON shape for one chat-turn batch, matching the external
//! chat-turn input contract: a mapping with `user_message`,
//! `assistant_message`, optional `assistant_reasoning`,
//! `conversation_history`, `timestamp`, and two caller-minted message ids.

use chrono::{DateTime, Utc};
use mnemo_model::{Message, Role};
use mnemo_pipeline::BatchInput;
use mnemo_prompt::HistoryItem;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchFile {
    pub user_message_id: String,
    pub assistant_message_id: String,
    pub user_message: String,
    pub assistant_message: String,
    #[serde(default)]
    pub assistant_reasoning: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    pub timestamp: DateTime<Utc>,
}

impl BatchFile {
    pub fn into_batch_input(self) -> BatchInput {
        let conversation_history = self
            .conversation_history
            .into_iter()
            .map(|entry| if entry.role.eq_ignore_ascii_case("user") { HistoryItem::user(entry.content) } else { HistoryItem::assistant(entry.content) })
            .collect();

        BatchInput {
            user_message: Message { message_id: self.user_message_id, role: Role::User, content: self.user_message, timestamp: self.timestamp },
            assistant_message: Message { message_id: self.assistant_message_id, role: Role::Assistant, content: self.assistant_message, timestamp: self.timestamp },
            assistant_reasoning: self.assistant_reasoning,
            conversation_history,
        }
    }
}
