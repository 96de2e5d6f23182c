//! The embedded proposition graph: propositions plus NEXT (temporal) and
//! COHERENT (semantic-similarity) edges, stored in a single `redb` file.

mod schema;
mod store;
mod vector;

pub use store::{EdgeCounts, GraphStore, PropositionPatch, SemanticNeighbor, VectorSearchResult};
