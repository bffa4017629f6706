//! In-memory implementation of [`ArtifactRepository`]
//!
//! Holds every table behind one `tokio::sync::RwLock`, so each operation is
//! atomic with respect to the others. Used for embedding the registry without
//! a database and as the datastore in tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, DependencyEdge, RelationshipEdge, ScoreRecord,
};

use crate::error::{DbError, DbResult};
use crate::repository::{ArtifactRepository, NewArtifact};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    artifacts: BTreeMap<ArtifactId, Artifact>,
    dependencies: Vec<DependencyEdge>,
    relationships: Vec<RelationshipEdge>,
}

/// Artifact repository backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryArtifactRepository {
    tables: RwLock<Tables>,
}

impl InMemoryArtifactRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts
    pub async fn artifact_count(&self) -> usize {
        self.tables.read().await.artifacts.len()
    }

    /// Every stored dependency edge, in insertion order
    pub async fn all_dependency_edges(&self) -> Vec<DependencyEdge> {
        self.tables.read().await.dependencies.clone()
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    #[instrument(skip(self, artifact), fields(kind = %artifact.kind, name = %artifact.metadata.name))]
    async fn create_artifact(&self, artifact: NewArtifact) -> DbResult<Artifact> {
        let mut tables = self.tables.write().await;
        tables.next_id += 1;
        let id = ArtifactId::new(tables.next_id);

        let stored = Artifact {
            id,
            kind: artifact.kind,
            metadata: artifact.metadata,
            score: artifact.score,
            created_at: Utc::now(),
        };
        tables.artifacts.insert(id, stored.clone());

        debug!(artifact_id = %id, "Artifact stored in memory");
        Ok(stored)
    }

    async fn find_by_id(&self, id: ArtifactId) -> DbResult<Option<Artifact>> {
        Ok(self.tables.read().await.artifacts.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> DbResult<Vec<Artifact>> {
        Ok(self
            .tables
            .read()
            .await
            .artifacts
            .values()
            .filter(|a| a.metadata.name == name)
            .cloned()
            .collect())
    }

    async fn list_by_kind(&self, kind: ArtifactKind) -> DbResult<Vec<Artifact>> {
        Ok(self
            .tables
            .read()
            .await
            .artifacts
            .values()
            .filter(|a| a.kind == kind)
            .cloned()
            .collect())
    }

    #[instrument(skip(self), fields(model_id = %edge.model_id, artifact_id = %edge.artifact_id))]
    async fn insert_dependency_edge(&self, edge: &DependencyEdge) -> DbResult<bool> {
        let mut tables = self.tables.write().await;

        for id in [edge.model_id, edge.artifact_id] {
            if !tables.artifacts.contains_key(&id) {
                return Err(DbError::ForeignKeyViolation(format!(
                    "artifact {} does not exist",
                    id
                )));
            }
        }

        let taken = tables.dependencies.iter().any(|existing| {
            existing.same_key(edge)
                || (existing.model_id == edge.model_id
                    && existing.dependency_type == edge.dependency_type)
        });
        if taken {
            debug!("Dependency edge ignored");
            return Ok(false);
        }

        tables.dependencies.push(edge.clone());
        Ok(true)
    }

    async fn list_dependency_edges(&self, model_id: ArtifactId) -> DbResult<Vec<DependencyEdge>> {
        Ok(self
            .tables
            .read()
            .await
            .dependencies
            .iter()
            .filter(|e| e.model_id == model_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self), fields(from = %edge.from_artifact_id, to = %edge.to_artifact_id))]
    async fn insert_relationship_edge(&self, edge: &RelationshipEdge) -> DbResult<bool> {
        if edge.is_self_loop() {
            return Err(DbError::ConstraintViolation(format!(
                "relationship edge from {} to itself",
                edge.from_artifact_id
            )));
        }

        let mut tables = self.tables.write().await;
        for id in [edge.from_artifact_id, edge.to_artifact_id] {
            if !tables.artifacts.contains_key(&id) {
                return Err(DbError::ForeignKeyViolation(format!(
                    "artifact {} does not exist",
                    id
                )));
            }
        }

        let exists = tables.relationships.iter().any(|existing| {
            existing.from_artifact_id == edge.from_artifact_id
                && existing.to_artifact_id == edge.to_artifact_id
                && existing.relationship_type == edge.relationship_type
        });
        if exists {
            return Ok(false);
        }

        tables.relationships.push(edge.clone());
        Ok(true)
    }

    async fn list_relationship_edges(&self, artifact_id: ArtifactId) -> DbResult<Vec<RelationshipEdge>> {
        Ok(self
            .tables
            .read()
            .await
            .relationships
            .iter()
            .filter(|e| e.from_artifact_id == artifact_id || e.to_artifact_id == artifact_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, record), fields(net_score = record.net_score))]
    async fn update_score_record(&self, id: ArtifactId, record: &ScoreRecord) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        let artifact = tables
            .artifacts
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        artifact.score = Some(record.clone());
        Ok(())
    }

    async fn delete_artifact(&self, id: ArtifactId) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.artifacts.remove(&id).is_none() {
            return Err(DbError::NotFound(id.to_string()));
        }
        tables
            .dependencies
            .retain(|e| e.model_id != id && e.artifact_id != id);
        tables
            .relationships
            .retain(|e| e.from_artifact_id != id && e.to_artifact_id != id);
        Ok(())
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trust_registry_core::{
        ArtifactMetadata, DependencyType, EdgeSource, RelationshipType,
    };

    async fn store(repo: &InMemoryArtifactRepository, kind: ArtifactKind, name: &str) -> Artifact {
        repo.create_artifact(NewArtifact::new(kind, ArtifactMetadata::new(name, name)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let repo = InMemoryArtifactRepository::new();
        let a = store(&repo, ArtifactKind::Model, "a").await;
        let b = store(&repo, ArtifactKind::Dataset, "b").await;
        assert_eq!(a.id, ArtifactId::new(1));
        assert_eq!(b.id, ArtifactId::new(2));
        assert_eq!(repo.list_models().await.unwrap().len(), 1);
        assert_eq!(repo.find_by_name("b").await.unwrap()[0].id, b.id);
    }

    #[tokio::test]
    async fn test_dependency_insert_is_idempotent_and_capped() {
        let repo = InMemoryArtifactRepository::new();
        let model = store(&repo, ArtifactKind::Model, "m").await;
        let first = store(&repo, ArtifactKind::Dataset, "d1").await;
        let second = store(&repo, ArtifactKind::Dataset, "d2").await;

        let edge = DependencyEdge::new(
            model.id,
            first.id,
            DependencyType::Dataset,
            EdgeSource::AutoDiscovered,
        );
        assert!(repo.insert_dependency_edge(&edge).await.unwrap());
        assert!(!repo.insert_dependency_edge(&edge).await.unwrap());

        let other = DependencyEdge::new(
            model.id,
            second.id,
            DependencyType::Dataset,
            EdgeSource::AutoDiscovered,
        );
        assert!(!repo.insert_dependency_edge(&other).await.unwrap());

        let edges = repo.list_dependency_edges(model.id).await.unwrap();
        assert_eq!(edges, vec![edge]);
        assert!(repo
            .has_dependency_of_type(model.id, DependencyType::Dataset)
            .await
            .unwrap());
        assert!(!repo
            .has_dependency_of_type(model.id, DependencyType::Code)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_dependency_requires_existing_artifacts() {
        let repo = InMemoryArtifactRepository::new();
        let model = store(&repo, ArtifactKind::Model, "m").await;
        let edge = DependencyEdge::new(
            model.id,
            ArtifactId::new(99),
            DependencyType::Code,
            EdgeSource::UserProvided,
        );
        let err = repo.insert_dependency_edge(&edge).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_relationships_listed_in_both_directions() {
        let repo = InMemoryArtifactRepository::new();
        let parent = store(&repo, ArtifactKind::Model, "parent").await;
        let child = store(&repo, ArtifactKind::Model, "child").await;

        let edge = RelationshipEdge::new(
            parent.id,
            child.id,
            RelationshipType::FineTunedFrom,
            EdgeSource::UserProvided,
        );
        assert!(repo.insert_relationship_edge(&edge).await.unwrap());
        assert!(!repo.insert_relationship_edge(&edge).await.unwrap());

        assert_eq!(repo.list_relationship_edges(parent.id).await.unwrap().len(), 1);
        assert_eq!(repo.list_relationship_edges(child.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_self_loop_rejected() {
        let repo = InMemoryArtifactRepository::new();
        let model = store(&repo, ArtifactKind::Model, "m").await;
        let edge = RelationshipEdge::new(
            model.id,
            model.id,
            RelationshipType::BaseModel,
            EdgeSource::AutoDiscovered,
        );
        assert!(repo.insert_relationship_edge(&edge).await.is_err());
    }

    #[tokio::test]
    async fn test_update_score_and_delete() {
        let repo = InMemoryArtifactRepository::new();
        let model = store(&repo, ArtifactKind::Model, "m").await;
        let dataset = store(&repo, ArtifactKind::Dataset, "d").await;
        repo.insert_dependency_edge(&DependencyEdge::new(
            model.id,
            dataset.id,
            DependencyType::Dataset,
            EdgeSource::AutoDiscovered,
        ))
        .await
        .unwrap();

        let record = ScoreRecord {
            net_score: 0.5,
            ..Default::default()
        };
        repo.update_score_record(model.id, &record).await.unwrap();
        let stored = repo.find_by_id(model.id).await.unwrap().unwrap();
        assert_eq!(stored.score, Some(record.clone()));

        assert!(repo
            .update_score_record(ArtifactId::new(42), &record)
            .await
            .unwrap_err()
            .is_not_found());

        repo.delete_artifact(dataset.id).await.unwrap();
        assert!(repo.list_dependency_edges(model.id).await.unwrap().is_empty());
        assert_eq!(repo.artifact_count().await, 1);
    }
}
