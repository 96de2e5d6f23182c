//! The relational archive: messages, semantic units, and propositions,
//! plus the cross-table lineage join.
//!
//! Three tables, upsert-by-primary-key writes, and a `get_full_lineage`
//! join across all three — tracing a proposition back to the semantic unit
//! and raw message it was derived from is inherently relational, so this
//! crate reaches for `rusqlite` (bundled) rather than bolting a join onto
//! the graph store.

mod convert;
mod schema;
mod store;

pub use store::{ArchiveStats, ArchivedProposition, ArchiveStore, Lineage};
