//! `store_propositions` and `create_edges`: the two commit stages that turn
//! a turn's extracted semantic units and propositions into durable rows and
//! graph edges, in the exact order `storage_nodes.py` commits them.

use chrono::{DateTime, Utc};
use mnemo_archive::ArchiveStore;
use mnemo_graph::GraphStore;
use mnemo_model::{EdgeCreator, ExtractionError, Message, Role, SemanticUnit};
use mnemo_thinker::ProtoProposition;
use uuid::Uuid;

/// A committed proposition's id paired with the embedding it was stored
/// with — `create_edges` needs both to build the semantic neighborhood.
pub type StoredProposition = (Uuid, Vec<f32>);

/// Runs the `store_propositions` stage (§4.8, step-numbered there):
/// archives both turn messages (plus a synthetic reasoning message when
/// present), archives both semantic units, then commits each proposition to
/// the graph store followed by the archive, in commit order.
///
/// `proto_props` must already be combined user-then-secondary, preserving
/// internal order within each half — the caller is responsible for that
/// ordering since it is what the NEXT chain keys off.
#[allow(clippy::too_many_arguments)]
pub async fn store_propositions(
    archive: &ArchiveStore,
    graph: &GraphStore,
    user_message: &Message,
    assistant_message: &Message,
    assistant_reasoning: Option<&str>,
    user_su: &SemanticUnit,
    secondary_su: &SemanticUnit,
    proto_props: Vec<ProtoProposition>,
    embeddings: Vec<Vec<f32>>,
    now: DateTime<Utc>,
) -> Result<Vec<StoredProposition>, ExtractionError> {
    archive.store_message(user_message, now)?;
    archive.store_message(assistant_message, now)?;
    if let Some(reasoning) = assistant_reasoning {
        let synthetic = Message {
            message_id: format!("{}_reasoning", assistant_message.message_id),
            role: Role::AssistantReasoning,
            content: reasoning.to_string(),
            timestamp: assistant_message.timestamp,
        };
        archive.store_message(&synthetic, now)?;
    }

    archive.store_semantic_unit(user_su, now)?;
    archive.store_semantic_unit(secondary_su, now)?;

    let mut stored = Vec::with_capacity(proto_props.len().min(embeddings.len()));
    for (proto, embedding) in proto_props.into_iter().zip(embeddings) {
        let proposition = proto.into_proposition(Uuid::nil(), embedding, now);
        let committed = graph.create_proposition(proposition, now)?;
        archive.store_proposition(
            committed.id,
            &committed.su_id,
            &committed.content,
            committed.su_type,
            committed.certainty,
            &committed.concepts,
            &committed.block_metadata,
            now,
        )?;
        stored.push((committed.id, committed.embedding));
    }

    Ok(stored)
}

/// Runs the `create_edges` stage: one NEXT edge per adjacent pair in commit
/// order, then a semantic-neighborhood search per proposition.
pub fn create_edges(graph: &GraphStore, stored: &[StoredProposition], top_k_neighbors: usize, similarity_threshold: f32, now: DateTime<Utc>) -> Result<(), ExtractionError> {
    for pair in stored.windows(2) {
        graph.create_temporal_edge(pair[0].0, pair[1].0, now)?;
    }

    for (id, embedding) in stored {
        let neighbors = graph.vector_search(embedding, top_k_neighbors + 1, similarity_threshold)?;
        for neighbor in neighbors {
            if neighbor.id != *id {
                graph.create_semantic_edge(*id, neighbor.id, neighbor.similarity, EdgeCreator::Extraction, now)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_model::{BlockMetadata, Certainty, NarrativeRole, SuType};

    fn sample_message(id: &str, role: Role) -> Message {
        Message { message_id: id.to_string(), role, content: "hello".to_string(), timestamp: Utc::now() }
    }

    fn sample_su(unit_id: &str, message_id: &str) -> SemanticUnit {
        SemanticUnit {
            unit_id: unit_id.to_string(),
            message_id: message_id.to_string(),
            content: "the user greeted the assistant".to_string(),
            speaker: "user".to_string(),
            timestamp: Utc::now(),
            su_type: SuType::Statement,
            narrative_role: NarrativeRole::Peripheral,
            certainty: Certainty::High,
            concepts: vec!["greeting".to_string()],
            block_metadata: BlockMetadata::default(),
            entities: vec![],
            decisions: vec![],
            context_dependencies: vec![],
            impact: None,
            relevance: None,
        }
    }

    fn sample_proto(su_id: &str, content: &str) -> ProtoProposition {
        ProtoProposition {
            su_id: su_id.to_string(),
            content: content.to_string(),
            su_type: SuType::Statement,
            certainty: Certainty::High,
            concepts: vec!["greeting".to_string()],
            block_metadata: BlockMetadata::default(),
            source_message_id: "m1".to_string(),
            speaker: "user".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn store_propositions_archives_messages_sus_and_commits_in_order() {
        let archive = ArchiveStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let graph = GraphStore::open(dir.path().join("g.redb")).unwrap();

        let user_message = sample_message("m1", Role::User);
        let assistant_message = sample_message("m2", Role::Assistant);
        let user_su = sample_su("su1", "m1");
        let assistant_su = sample_su("su2", "m2");
        let props = vec![sample_proto("su1", "first fact"), sample_proto("su2", "second fact")];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

        let stored = store_propositions(&archive, &graph, &user_message, &assistant_message, None, &user_su, &assistant_su, props, embeddings, Utc::now())
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert!(archive.get_message("m1").unwrap().is_some());
        assert!(archive.get_message("m2").unwrap().is_some());
        assert!(archive.get_semantic_unit("su1").unwrap().is_some());
        assert_eq!(graph.count_propositions().unwrap(), 2);
    }

    #[tokio::test]
    async fn store_propositions_archives_a_synthetic_reasoning_message_when_present() {
        let archive = ArchiveStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let graph = GraphStore::open(dir.path().join("g.redb")).unwrap();

        let user_message = sample_message("m1", Role::User);
        let assistant_message = sample_message("m2", Role::Assistant);
        let user_su = sample_su("su1", "m1");
        let reasoning_su = sample_su("su2", "m2_reasoning");

        store_propositions(&archive, &graph, &user_message, &assistant_message, Some("because reasons"), &user_su, &reasoning_su, vec![], vec![], Utc::now())
            .await
            .unwrap();

        let synthetic = archive.get_message("m2_reasoning").unwrap().unwrap();
        assert_eq!(synthetic.content, "because reasons");
        assert_eq!(synthetic.role, Role::AssistantReasoning);
    }

    #[test]
    fn create_edges_builds_a_temporal_chain_and_skips_self_neighbors() {
        let dir = tempfile::tempdir().unwrap();
        let graph = GraphStore::open(dir.path().join("g.redb")).unwrap();

        let mut stored = Vec::new();
        for (content, embedding) in [("a", vec![1.0, 0.0]), ("b", vec![0.9, 0.1]), ("c", vec![0.0, 1.0])] {
            let proto = sample_proto("su1", content);
            let proposition = proto.into_proposition(Uuid::nil(), embedding.clone(), Utc::now());
            let committed = graph.create_proposition(proposition, Utc::now()).unwrap();
            stored.push((committed.id, embedding));
        }

        create_edges(&graph, &stored, 10, 0.4, Utc::now()).unwrap();

        let chain = graph.get_temporal_chain().unwrap();
        assert_eq!(chain.len(), 2);

        let neighbors_of_a = graph.get_semantic_neighbors(stored[0].0, 0.0).unwrap();
        assert!(neighbors_of_a.iter().all(|n| n.id != stored[0].0));
    }
}
