use serde::{Deserialize, Serialize};

/// Structured annotations carried by a `resource`, `decision`, or `document`
/// semantic unit, and inherited field-for-field by every proposition derived
/// from it. Every field is optional: only the subset relevant to the unit's
/// `type` is ever populated (see `SuType`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockMetadata {
    // resource
    pub resource_url: Option<String>,
    pub resource_type: Option<String>,
    pub resource_title: Option<String>,
    pub discussed_context: Option<String>,

    // decision
    pub decision_choice: Option<String>,
    pub decision_reason: Option<String>,
    pub decision_alternatives: Vec<String>,
    pub decision_confidence: Option<String>,

    // document
    pub doc_filename: Option<String>,
    pub doc_location: Option<String>,
    pub doc_purpose: Option<String>,
    pub doc_key_settings: Vec<String>,
}

impl BlockMetadata {
    pub fn is_empty(&self) -> bool {
        self == &BlockMetadata::default()
    }
}
