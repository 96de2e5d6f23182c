//! redb table definitions for the embedded graph store.
//!
//! Values are `serde_json`-encoded rather than `bincode`: JSON keeps the
//! on-disk rows inspectable with any redb browser and avoids a second
//! serialization format for data that's already JSON at the API boundary.

use redb::TableDefinition;

/// `proposition_id (uuid string) -> serde_json(Proposition)`.
pub(crate) const PROPOSITIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("propositions");

/// `"{from_id}->{to_id}" -> serde_json(NextEdge)`. One row per directed
/// temporal edge; MERGE-semantics means a re-insert of the same key is a
/// no-op rather than refreshing `created_at`.
pub(crate) const NEXT_EDGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("next_edges");

/// `"{a_id}|{b_id}"` (canonical, smaller id first) `-> serde_json(CoherentEdge)`.
pub(crate) const COHERENT_EDGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("coherent_edges");

pub(crate) fn next_edge_key(from: uuid::Uuid, to: uuid::Uuid) -> String {
    format!("{from}->{to}")
}

pub(crate) fn coherent_edge_key(a: uuid::Uuid, b: uuid::Uuid) -> String {
    let (a, b) = mnemo_model::CoherentEdge::canonical_pair(a, b);
    format!("{a}|{b}")
}
