//! DDL for the three archive tables: messages, semantic units, and
//! propositions, each indexed on the foreign key the lineage join walks.

use mnemo_model::ExtractionError;
use rusqlite::Connection;

pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), ExtractionError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id         TEXT PRIMARY KEY,
            role       TEXT NOT NULL,
            content    TEXT NOT NULL,
            timestamp  TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS semantic_units (
            unit_id              TEXT PRIMARY KEY,
            message_id           TEXT NOT NULL,
            content              TEXT NOT NULL,
            type                 TEXT NOT NULL,
            narrative_role       TEXT NOT NULL,
            concepts             TEXT NOT NULL,
            entities             TEXT NOT NULL,
            decisions            TEXT NOT NULL,
            certainty            TEXT NOT NULL,
            context_dependencies TEXT NOT NULL,
            impact               TEXT,
            relevance            TEXT,
            metadata             TEXT NOT NULL,
            created_at           TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS propositions_archive (
            proposition_id    TEXT PRIMARY KEY,
            semantic_unit_id  TEXT NOT NULL,
            content           TEXT NOT NULL,
            type              TEXT NOT NULL,
            certainty         TEXT NOT NULL,
            concepts          TEXT NOT NULL,
            metadata          TEXT NOT NULL,
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
        CREATE INDEX IF NOT EXISTS idx_semantic_units_message ON semantic_units(message_id);
        CREATE INDEX IF NOT EXISTS idx_propositions_semantic_unit ON propositions_archive(semantic_unit_id);
        "#,
    )
    .map_err(|e| ExtractionError::StoreTransport { message: format!("archive schema setup failed: {e}") })
}
