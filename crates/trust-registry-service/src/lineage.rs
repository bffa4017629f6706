//! Lineage graph construction
//!
//! Breadth-first walk over model-to-model relationships starting at a root
//! model. Each visited model contributes its embedded lineage hints and its
//! persisted relationship edges in both directions. Placeholder parents
//! become `external:<name>` nodes and are never expanded. A visited set keyed
//! by node id guarantees termination on cyclic lineage.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, LineageEdge, LineageGraph, LineageNode, LineageParent,
    RelationshipType,
};
use trust_registry_db::ArtifactRepository;

use crate::error::{ServiceError, ServiceResult};

/// Trait for lineage lookups
#[async_trait]
pub trait LineageGraphBuilder: Send + Sync {
    /// Build the lineage graph reachable from a model
    ///
    /// # Returns
    /// * `Ok(LineageGraph)` - Nodes and edges between models
    /// * `Err(ServiceError::NotFound)` - If the root doesn't exist
    /// * `Err(ServiceError::InvalidType)` - If the root is not a model
    async fn build_lineage(&self, root: ArtifactId) -> ServiceResult<LineageGraph>;
}

/// Default implementation of LineageGraphBuilder
pub struct DefaultLineageGraphBuilder {
    repository: Arc<dyn ArtifactRepository>,
}

impl DefaultLineageGraphBuilder {
    pub fn new(repository: Arc<dyn ArtifactRepository>) -> Self {
        Self { repository }
    }
}

/// Per-walk state: the graph so far, the frontier and a model cache
struct Walk {
    graph: LineageGraph,
    visited: HashSet<String>,
    queue: VecDeque<Artifact>,
    models: HashMap<ArtifactId, Option<Artifact>>,
}

impl Walk {
    fn new(root: Artifact) -> Self {
        let node = LineageNode::artifact(root.id, root.name());
        let mut visited = HashSet::new();
        visited.insert(node.id.clone());

        let mut graph = LineageGraph::new();
        graph.add_node(node);

        let mut models = HashMap::new();
        models.insert(root.id, Some(root.clone()));

        Self {
            graph,
            visited,
            queue: VecDeque::from([root]),
            models,
        }
    }

    /// Record `parent -> child` and enqueue the parent or child if unseen
    fn connect(&mut self, from: &Artifact, to: &Artifact, relationship: RelationshipType) {
        for artifact in [from, to] {
            let node = LineageNode::artifact(artifact.id, artifact.name());
            if self.visited.insert(node.id.clone()) {
                self.queue.push_back(artifact.clone());
            }
            self.graph.add_node(node);
        }
        self.graph.add_edge(LineageEdge {
            from: from.id.to_string(),
            to: to.id.to_string(),
            relationship,
        });
    }

    fn connect_external(&mut self, name: &str, child: &Artifact, relationship: RelationshipType) {
        let node = LineageNode::external(name);
        let from = node.id.clone();
        self.graph.add_node(node);
        self.graph.add_edge(LineageEdge {
            from,
            to: child.id.to_string(),
            relationship,
        });
    }
}

impl DefaultLineageGraphBuilder {
    /// Load a model through the walk's cache; non-models and missing ids yield `None`
    async fn model(&self, walk: &mut Walk, id: ArtifactId) -> ServiceResult<Option<Artifact>> {
        if let Some(cached) = walk.models.get(&id) {
            return Ok(cached.clone());
        }
        let loaded = self
            .repository
            .find_by_id(id)
            .await?
            .filter(Artifact::is_model);
        if loaded.is_none() {
            debug!(artifact_id = %id, "Lineage reference is not a stored model, skipping");
        }
        walk.models.insert(id, loaded.clone());
        Ok(loaded)
    }

    async fn expand(&self, walk: &mut Walk, current: Artifact) -> ServiceResult<()> {
        for hint in &current.metadata.auto_lineage {
            match &hint.parent {
                LineageParent::Resolved(parent_id) => {
                    if let Some(parent) = self.model(walk, *parent_id).await? {
                        walk.connect(&parent, &current, hint.relationship.clone());
                    }
                }
                LineageParent::Placeholder(name) => {
                    walk.connect_external(name, &current, hint.relationship.clone());
                }
            }
        }

        for edge in self.repository.list_relationship_edges(current.id).await? {
            let Some(other_id) = edge.other_end(current.id) else {
                continue;
            };
            let Some(other) = self.model(walk, other_id).await? else {
                continue;
            };
            if edge.from_artifact_id == current.id {
                walk.connect(&current, &other, edge.relationship_type);
            } else {
                walk.connect(&other, &current, edge.relationship_type);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LineageGraphBuilder for DefaultLineageGraphBuilder {
    #[instrument(skip(self), fields(root = %root))]
    async fn build_lineage(&self, root: ArtifactId) -> ServiceResult<LineageGraph> {
        let artifact = self
            .repository
            .find_by_id(root)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("artifact {}", root)))?;
        artifact.require_kind(ArtifactKind::Model)?;

        let mut walk = Walk::new(artifact);
        while let Some(current) = walk.queue.pop_front() {
            self.expand(&mut walk, current).await?;
        }

        info!(
            nodes = walk.graph.node_count(),
            edges = walk.graph.edge_count(),
            "Lineage graph built"
        );
        Ok(walk.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trust_registry_core::{ArtifactMetadata, EdgeSource, LineageHint, RelationshipEdge};
    use trust_registry_db::{InMemoryArtifactRepository, NewArtifact};

    async fn model(repo: &InMemoryArtifactRepository, metadata: ArtifactMetadata) -> Artifact {
        repo.create_artifact(NewArtifact::new(ArtifactKind::Model, metadata))
            .await
            .unwrap()
    }

    async fn relate(
        repo: &InMemoryArtifactRepository,
        from: ArtifactId,
        to: ArtifactId,
        relationship: RelationshipType,
    ) {
        repo.insert_relationship_edge(&RelationshipEdge::new(
            from,
            to,
            relationship,
            EdgeSource::UserProvided,
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_cycle_terminates_with_each_edge_once() {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let a = model(&repo, ArtifactMetadata::new("org/a", "a")).await;
        let b = model(&repo, ArtifactMetadata::new("org/b", "b")).await;
        relate(&repo, b.id, a.id, RelationshipType::DerivedFrom).await;
        relate(&repo, a.id, b.id, RelationshipType::DerivedFrom).await;

        let graph = DefaultLineageGraphBuilder::new(repo)
            .build_lineage(a.id)
            .await
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        let unique: HashSet<_> = graph.edges.iter().collect();
        assert_eq!(unique.len(), 2);
    }

    #[tokio::test]
    async fn test_hints_and_placeholders() {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let base = model(&repo, ArtifactMetadata::new("org/base", "base")).await;
        let child_meta = ArtifactMetadata::builder("org/child", "child")
            .lineage_hint(LineageHint::new(
                LineageParent::Resolved(base.id),
                RelationshipType::BaseModel,
                "config.base_model",
            ))
            .lineage_hint(LineageHint::new(
                LineageParent::Placeholder("meta-llama/Llama-2-7b".into()),
                RelationshipType::TeacherModel,
                "config.teacher_model",
            ))
            .build_unchecked();
        let child = model(&repo, child_meta).await;

        let graph = DefaultLineageGraphBuilder::new(repo)
            .build_lineage(child.id)
            .await
            .unwrap();

        assert_eq!(graph.node_count(), 3);
        assert!(graph.contains_node("external:meta-llama/Llama-2-7b"));
        assert!(graph.edges.contains(&LineageEdge {
            from: base.id.to_string(),
            to: child.id.to_string(),
            relationship: RelationshipType::BaseModel,
        }));
    }

    #[tokio::test]
    async fn test_walks_descendants_too() {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let root = model(&repo, ArtifactMetadata::new("org/root", "root")).await;
        let child = model(&repo, ArtifactMetadata::new("org/child", "child")).await;
        let grandchild = model(&repo, ArtifactMetadata::new("org/gc", "gc")).await;
        relate(&repo, root.id, child.id, RelationshipType::FineTunedFrom).await;
        relate(&repo, child.id, grandchild.id, RelationshipType::Adapter("lora".into())).await;

        let graph = DefaultLineageGraphBuilder::new(repo)
            .build_lineage(root.id)
            .await
            .unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn test_non_model_neighbours_are_ignored() {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let root = model(&repo, ArtifactMetadata::new("org/root", "root")).await;
        let dataset = repo
            .create_artifact(NewArtifact::new(
                ArtifactKind::Dataset,
                ArtifactMetadata::new("squad", "squad"),
            ))
            .await
            .unwrap();
        let meta = ArtifactMetadata::builder("org/other", "other")
            .lineage_hint(LineageHint::new(
                LineageParent::Resolved(dataset.id),
                RelationshipType::DerivedFrom,
                "config.derived_from",
            ))
            .build_unchecked();
        let other = model(&repo, meta).await;
        relate(&repo, root.id, other.id, RelationshipType::BaseModel).await;

        let graph = DefaultLineageGraphBuilder::new(repo)
            .build_lineage(root.id)
            .await
            .unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(!graph.contains_node(&dataset.id.to_string()));
    }

    #[tokio::test]
    async fn test_root_errors() {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let dataset = repo
            .create_artifact(NewArtifact::new(
                ArtifactKind::Dataset,
                ArtifactMetadata::new("squad", "squad"),
            ))
            .await
            .unwrap();
        let builder = DefaultLineageGraphBuilder::new(repo);

        let missing = builder.build_lineage(ArtifactId::new(42)).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let wrong = builder.build_lineage(dataset.id).await;
        assert!(matches!(wrong, Err(ServiceError::InvalidType(_))));
    }
}
