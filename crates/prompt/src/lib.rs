//! Context-window construction and Stage 1/Stage 2 prompt assembly.
//!
//! Every function here is pure: `(history, k) -> String` for the context
//! window, `(message, context, ...) -> String` for prompt templates. No
//! mutable global state, no I/O — prompts are just owned `String`s built
//! from smaller owned `String`s, which keeps them trivial to snapshot-test
//! without touching a network client.

mod context;
mod stage1;
mod stage2;

pub use context::{HistoryItem, context_window};
pub use stage1::{build_reasoning_prompt, build_stage1_assistant_prompt, build_stage1_user_prompt};
pub use stage2::build_stage2_prompt;
