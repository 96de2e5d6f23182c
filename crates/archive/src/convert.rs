//! Enum/list column marshalling. Every enum round-trips through its
//! existing `serde` implementation (`rename_all = "snake_case"`) rather than
//! a second hand-written match arm set; lists go through plain JSON.

use mnemo_model::ExtractionError;
use serde::{de::DeserializeOwned, Serialize};

pub(crate) fn to_text<T: Serialize>(value: &T) -> Result<String, ExtractionError> {
    serde_json::to_string(value).map_err(|e| ExtractionError::StoreTransport { message: format!("archive serialize failed: {e}") })
}

pub(crate) fn from_text<T: DeserializeOwned>(text: &str) -> Result<T, ExtractionError> {
    serde_json::from_str(text).map_err(|e| ExtractionError::StoreTransport { message: format!("archive deserialize failed: {e}") })
}

/// Enum columns are stored without the surrounding JSON quotes (`"high"`
/// rather than `\"high\"`) so the column reads cleanly when the database is
/// inspected directly — matching the plain-string columns the original
/// SQLite archive used.
pub(crate) fn enum_to_text<T: Serialize>(value: &T) -> Result<String, ExtractionError> {
    let quoted = to_text(value)?;
    Ok(quoted.trim_matches('"').to_string())
}

pub(crate) fn enum_from_text<T: DeserializeOwned>(text: &str) -> Result<T, ExtractionError> {
    from_text(&format!("\"{text}\""))
}
