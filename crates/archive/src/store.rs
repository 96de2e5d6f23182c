//! The relational archive store. Every write is an upsert by primary key
//! (`INSERT OR REPLACE`), so replaying a turn against an already-populated
//! archive updates rather than duplicates. A single `Mutex<Connection>`
//! serializes writes across concurrent orchestrator invocations — `rusqlite`
//! connections aren't `Sync`, and at this scale a held mutex is simpler than
//! a connection pool.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use mnemo_model::{BlockMetadata, Certainty, ExtractionError, Message, Role, SemanticUnit, SuType};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::convert::{enum_from_text, enum_to_text, from_text, to_text};
use crate::schema::ensure_schema;

/// The schema's `semantic_units.metadata` column has no dedicated `speaker`
/// column (§4.7 lists none), so `speaker` rides along inside the same JSON
/// blob as `block_metadata` rather than being dropped on the way to disk.
#[derive(serde::Serialize, serde::Deserialize)]
struct SuMetadata {
    speaker: String,
    block_metadata: BlockMetadata,
}

/// A proposition row as the archive stores it: no embedding (that lives
/// only in the graph store), content/type/certainty/concepts/metadata plus
/// the timestamp it was archived.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedProposition {
    pub proposition_id: Uuid,
    pub semantic_unit_id: String,
    pub content: String,
    pub su_type: SuType,
    pub certainty: Certainty,
    pub concepts: Vec<String>,
    pub block_metadata: BlockMetadata,
    pub created_at: DateTime<Utc>,
}

/// The joined result of `get_full_lineage`: exactly one row per
/// proposition, tracing it back through its semantic unit to its source
/// message (§4.7).
#[derive(Debug, Clone)]
pub struct Lineage {
    pub message: Message,
    pub semantic_unit: SemanticUnit,
    pub proposition: ArchivedProposition,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveStats {
    pub messages: u64,
    pub semantic_units: u64,
    pub propositions: u64,
}

pub struct ArchiveStore {
    conn: Mutex<Connection>,
}

impl ArchiveStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let conn = Connection::open(path).map_err(|e| ExtractionError::StoreTransport { message: format!("opening archive database: {e}") })?;
        ensure_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, ExtractionError> {
        let conn = Connection::open_in_memory().map_err(|e| ExtractionError::StoreTransport { message: format!("opening in-memory archive: {e}") })?;
        ensure_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ExtractionError> {
        self.conn.lock().map_err(|_| ExtractionError::StoreTransport { message: "archive connection mutex poisoned".to_string() })
    }

    pub fn store_message(&self, message: &Message, archived_at: DateTime<Utc>) -> Result<(), ExtractionError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO messages (id, role, content, timestamp, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![message.message_id, enum_to_text(&message.role)?, message.content, message.timestamp.to_rfc3339(), archived_at.to_rfc3339()],
        )
        .map_err(|e| ExtractionError::StoreTransport { message: format!("store_message failed: {e}") })?;
        Ok(())
    }

    pub fn store_semantic_unit(&self, su: &SemanticUnit, archived_at: DateTime<Utc>) -> Result<(), ExtractionError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO semantic_units
                (unit_id, message_id, content, type, narrative_role, concepts, entities, decisions,
                 certainty, context_dependencies, impact, relevance, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                su.unit_id,
                su.message_id,
                su.content,
                enum_to_text(&su.su_type)?,
                enum_to_text(&su.narrative_role)?,
                to_text(&su.concepts)?,
                to_text(&su.entities)?,
                to_text(&su.decisions)?,
                enum_to_text(&su.certainty)?,
                to_text(&su.context_dependencies)?,
                su.impact,
                su.relevance,
                to_text(&SuMetadata { speaker: su.speaker.clone(), block_metadata: su.block_metadata.clone() })?,
                archived_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ExtractionError::StoreTransport { message: format!("store_semantic_unit failed: {e}") })?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn store_proposition(
        &self,
        proposition_id: Uuid,
        semantic_unit_id: &str,
        content: &str,
        su_type: SuType,
        certainty: Certainty,
        concepts: &[String],
        block_metadata: &BlockMetadata,
        archived_at: DateTime<Utc>,
    ) -> Result<(), ExtractionError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO propositions_archive
                (proposition_id, semantic_unit_id, content, type, certainty, concepts, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                proposition_id.to_string(),
                semantic_unit_id,
                content,
                enum_to_text(&su_type)?,
                enum_to_text(&certainty)?,
                to_text(&concepts.to_vec())?,
                to_text(block_metadata)?,
                archived_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ExtractionError::StoreTransport { message: format!("store_proposition failed: {e}") })?;
        Ok(())
    }

    pub fn get_message(&self, id: &str) -> Result<Option<Message>, ExtractionError> {
        let conn = self.lock()?;
        conn.query_row("SELECT id, role, content, timestamp FROM messages WHERE id = ?1", params![id], row_to_message)
            .optional()
            .map_err(|e| ExtractionError::StoreTransport { message: format!("get_message failed: {e}") })
    }

    pub fn get_semantic_unit(&self, unit_id: &str) -> Result<Option<SemanticUnit>, ExtractionError> {
        let conn = self.lock()?;
        conn.query_row(SEMANTIC_UNIT_SELECT_BY_UNIT_ID, params![unit_id], row_to_semantic_unit)
            .optional()
            .map_err(|e| ExtractionError::StoreTransport { message: format!("get_semantic_unit failed: {e}") })
    }

    pub fn get_semantic_units_by_message(&self, message_id: &str) -> Result<Vec<SemanticUnit>, ExtractionError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT su.unit_id, su.message_id, su.content, su.type, su.narrative_role, su.concepts, su.entities, su.decisions,
                        su.certainty, su.context_dependencies, su.impact, su.relevance, su.metadata, m.timestamp
                 FROM semantic_units su JOIN messages m ON su.message_id = m.id
                 WHERE su.message_id = ?1",
            )
            .map_err(|e| ExtractionError::StoreTransport { message: format!("get_semantic_units_by_message prepare failed: {e}") })?;
        let rows = stmt
            .query_map(params![message_id], row_to_semantic_unit)
            .map_err(|e| ExtractionError::StoreTransport { message: format!("get_semantic_units_by_message failed: {e}") })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| ExtractionError::StoreTransport { message: format!("get_semantic_units_by_message row decode failed: {e}") })
    }

    pub fn get_proposition(&self, proposition_id: Uuid) -> Result<Option<ArchivedProposition>, ExtractionError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT proposition_id, semantic_unit_id, content, type, certainty, concepts, metadata, created_at
             FROM propositions_archive WHERE proposition_id = ?1",
            params![proposition_id.to_string()],
            row_to_archived_proposition,
        )
        .optional()
        .map_err(|e| ExtractionError::StoreTransport { message: format!("get_proposition failed: {e}") })
    }

    /// Joins `propositions_archive` → `semantic_units` → `messages`,
    /// returning exactly one row for the given proposition (§4.7).
    pub fn get_full_lineage(&self, proposition_id: Uuid) -> Result<Option<Lineage>, ExtractionError> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT
                    m.id, m.role, m.content, m.timestamp,
                    su.unit_id, su.message_id, su.content, su.type, su.narrative_role, su.concepts,
                    su.entities, su.decisions, su.certainty, su.context_dependencies, su.impact, su.relevance, su.metadata,
                    pa.proposition_id, pa.semantic_unit_id, pa.content, pa.type, pa.certainty, pa.concepts, pa.metadata, pa.created_at
                 FROM propositions_archive pa
                 JOIN semantic_units su ON pa.semantic_unit_id = su.unit_id
                 JOIN messages m ON su.message_id = m.id
                 WHERE pa.proposition_id = ?1",
                params![proposition_id.to_string()],
                row_to_lineage,
            )
            .optional()
            .map_err(|e| ExtractionError::StoreTransport { message: format!("get_full_lineage failed: {e}") })?;
        Ok(result)
    }

    pub fn get_stats(&self) -> Result<ArchiveStats, ExtractionError> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<u64, ExtractionError> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| ExtractionError::StoreTransport { message: format!("get_stats({table}) failed: {e}") })
        };
        Ok(ArchiveStats { messages: count("messages")?, semantic_units: count("semantic_units")?, propositions: count("propositions_archive")? })
    }
}

const SEMANTIC_UNIT_SELECT_BY_UNIT_ID: &str =
    "SELECT su.unit_id, su.message_id, su.content, su.type, su.narrative_role, su.concepts, su.entities, su.decisions,
            su.certainty, su.context_dependencies, su.impact, su.relevance, su.metadata, m.timestamp
     FROM semantic_units su JOIN messages m ON su.message_id = m.id
     WHERE su.unit_id = ?1";

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let role_text: String = row.get(1)?;
    let timestamp_text: String = row.get(3)?;
    Ok(Message {
        message_id: row.get(0)?,
        role: enum_from_text::<Role>(&role_text).map_err(to_rusqlite_err)?,
        content: row.get(2)?,
        timestamp: parse_rfc3339(&timestamp_text)?,
    })
}

fn row_to_semantic_unit(row: &rusqlite::Row) -> rusqlite::Result<SemanticUnit> {
    let su_type_text: String = row.get(3)?;
    let narrative_role_text: String = row.get(4)?;
    let concepts_text: String = row.get(5)?;
    let entities_text: String = row.get(6)?;
    let decisions_text: String = row.get(7)?;
    let certainty_text: String = row.get(8)?;
    let context_dependencies_text: String = row.get(9)?;
    let metadata_text: String = row.get(12)?;
    let timestamp_text: String = row.get(13)?;
    let su_metadata: SuMetadata = from_text(&metadata_text).map_err(to_rusqlite_err)?;

    Ok(SemanticUnit {
        unit_id: row.get(0)?,
        message_id: row.get(1)?,
        content: row.get(2)?,
        speaker: su_metadata.speaker,
        timestamp: parse_rfc3339(&timestamp_text)?,
        su_type: enum_from_text(&su_type_text).map_err(to_rusqlite_err)?,
        narrative_role: enum_from_text(&narrative_role_text).map_err(to_rusqlite_err)?,
        certainty: enum_from_text(&certainty_text).map_err(to_rusqlite_err)?,
        concepts: from_text(&concepts_text).map_err(to_rusqlite_err)?,
        block_metadata: su_metadata.block_metadata,
        entities: from_text(&entities_text).map_err(to_rusqlite_err)?,
        decisions: from_text(&decisions_text).map_err(to_rusqlite_err)?,
        context_dependencies: from_text(&context_dependencies_text).map_err(to_rusqlite_err)?,
        impact: row.get(10)?,
        relevance: row.get(11)?,
    })
}

fn row_to_archived_proposition(row: &rusqlite::Row) -> rusqlite::Result<ArchivedProposition> {
    let id_text: String = row.get(0)?;
    let su_type_text: String = row.get(3)?;
    let certainty_text: String = row.get(4)?;
    let concepts_text: String = row.get(5)?;
    let metadata_text: String = row.get(6)?;
    let created_at_text: String = row.get(7)?;

    Ok(ArchivedProposition {
        proposition_id: Uuid::parse_str(&id_text).map_err(to_rusqlite_err)?,
        semantic_unit_id: row.get(1)?,
        content: row.get(2)?,
        su_type: enum_from_text(&su_type_text).map_err(to_rusqlite_err)?,
        certainty: enum_from_text(&certainty_text).map_err(to_rusqlite_err)?,
        concepts: from_text(&concepts_text).map_err(to_rusqlite_err)?,
        block_metadata: from_text(&metadata_text).map_err(to_rusqlite_err)?,
        created_at: parse_rfc3339(&created_at_text)?,
    })
}

fn row_to_lineage(row: &rusqlite::Row) -> rusqlite::Result<Lineage> {
    let message_role_text: String = row.get(1)?;
    let message_timestamp_text: String = row.get(3)?;
    let message = Message {
        message_id: row.get(0)?,
        role: enum_from_text::<Role>(&message_role_text).map_err(to_rusqlite_err)?,
        content: row.get(2)?,
        timestamp: parse_rfc3339(&message_timestamp_text)?,
    };

    let su_type_text: String = row.get(7)?;
    let narrative_role_text: String = row.get(8)?;
    let concepts_text: String = row.get(9)?;
    let entities_text: String = row.get(10)?;
    let decisions_text: String = row.get(11)?;
    let certainty_text: String = row.get(12)?;
    let context_dependencies_text: String = row.get(13)?;
    let su_metadata_text: String = row.get(16)?;
    let su_metadata: SuMetadata = from_text(&su_metadata_text).map_err(to_rusqlite_err)?;

    let semantic_unit = SemanticUnit {
        unit_id: row.get(4)?,
        message_id: row.get(5)?,
        content: row.get(6)?,
        speaker: su_metadata.speaker,
        timestamp: message.timestamp,
        su_type: enum_from_text(&su_type_text).map_err(to_rusqlite_err)?,
        narrative_role: enum_from_text(&narrative_role_text).map_err(to_rusqlite_err)?,
        certainty: enum_from_text(&certainty_text).map_err(to_rusqlite_err)?,
        concepts: from_text(&concepts_text).map_err(to_rusqlite_err)?,
        block_metadata: su_metadata.block_metadata,
        entities: from_text(&entities_text).map_err(to_rusqlite_err)?,
        decisions: from_text(&decisions_text).map_err(to_rusqlite_err)?,
        context_dependencies: from_text(&context_dependencies_text).map_err(to_rusqlite_err)?,
        impact: row.get(14)?,
        relevance: row.get(15)?,
    };

    let prop_id_text: String = row.get(17)?;
    let prop_type_text: String = row.get(20)?;
    let prop_certainty_text: String = row.get(21)?;
    let prop_concepts_text: String = row.get(22)?;
    let prop_metadata_text: String = row.get(23)?;
    let prop_created_at_text: String = row.get(24)?;

    let proposition = ArchivedProposition {
        proposition_id: Uuid::parse_str(&prop_id_text).map_err(to_rusqlite_err)?,
        semantic_unit_id: row.get(18)?,
        content: row.get(19)?,
        su_type: enum_from_text(&prop_type_text).map_err(to_rusqlite_err)?,
        certainty: enum_from_text(&prop_certainty_text).map_err(to_rusqlite_err)?,
        concepts: from_text(&prop_concepts_text).map_err(to_rusqlite_err)?,
        block_metadata: from_text(&prop_metadata_text).map_err(to_rusqlite_err)?,
        created_at: parse_rfc3339(&prop_created_at_text)?,
    };

    Ok(Lineage { message, semantic_unit, proposition })
}

fn parse_rfc3339(text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc)).map_err(to_rusqlite_err)
}

fn to_rusqlite_err<E: std::fmt::Display>(e: E) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))
}
