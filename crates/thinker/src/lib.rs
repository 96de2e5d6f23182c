//! Stage 1 (semantic-unit extraction) and Stage 2 (propositionalization).
//!
//! V1 folds reasoning into the assistant semantic unit; V2 splits it into
//! its own reasoning unit (user facts vs. reasoning logic vs. raw-stored
//! assistant display text) so a caller who wants to separate "what the
//! assistant decided" from "what the assistant said" can do so without
//! re-parsing the message.

mod extraction;
mod proto_proposition;
mod propositionalize;
mod raw;

pub use extraction::{extract_assistant_su, extract_reasoning_su, extract_user_su};
pub use proto_proposition::ProtoProposition;
pub use propositionalize::{propositionalize, MAX_PROPOSITIONS, MIN_PROPOSITIONS};

/// An extracted semantic unit is considered "empty" (Stage 1 failed) when
/// its content is blank. Downstream stages use this to short-circuit
/// without fabricating propositions, per the failure semantics in §4.3.
pub fn is_empty_su(su: &mnemo_model::SemanticUnit) -> bool {
    su.content.trim().is_empty()
}
