//! Repository trait abstraction for artifact persistence
//!
//! This module defines the [`ArtifactRepository`] trait: the narrow
//! query/command interface the scoring, resolution and lineage components
//! consume. Implementations exist for PostgreSQL and for an in-memory store.

use async_trait::async_trait;
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, ArtifactMetadata, DependencyEdge, DependencyType,
    RelationshipEdge, ScoreRecord,
};

use crate::error::DbResult;

/// An artifact that has not been assigned an id yet
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub kind: ArtifactKind,
    pub metadata: ArtifactMetadata,
    /// Initial score record, usually `None`
    pub score: Option<ScoreRecord>,
}

impl NewArtifact {
    pub fn new(kind: ArtifactKind, metadata: ArtifactMetadata) -> Self {
        Self {
            kind,
            metadata,
            score: None,
        }
    }
}

/// Repository trait for artifact persistence operations
///
/// Implementations must be thread-safe (Send + Sync) for use in async contexts.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Store a new artifact and assign its id
    ///
    /// # Returns
    /// * `Ok(Artifact)` - The stored artifact with its id
    /// * `Err(DbError)` - For database errors
    async fn create_artifact(&self, artifact: NewArtifact) -> DbResult<Artifact>;

    /// Find an artifact by id
    ///
    /// # Returns
    /// * `Ok(Some(Artifact))` - The artifact if found
    /// * `Ok(None)` - If no artifact with that id exists
    async fn find_by_id(&self, id: ArtifactId) -> DbResult<Option<Artifact>>;

    /// Find every artifact with exactly this name, oldest first
    async fn find_by_name(&self, name: &str) -> DbResult<Vec<Artifact>>;

    /// List every artifact of a kind, oldest first
    async fn list_by_kind(&self, kind: ArtifactKind) -> DbResult<Vec<Artifact>>;

    /// List every model
    async fn list_models(&self) -> DbResult<Vec<Artifact>> {
        self.list_by_kind(ArtifactKind::Model).await
    }

    /// Insert a dependency edge unless it is already present
    ///
    /// # Returns
    /// * `Ok(true)` - The edge was inserted
    /// * `Ok(false)` - The edge already existed, or the model already holds
    ///   an edge of the same dependency type
    async fn insert_dependency_edge(&self, edge: &DependencyEdge) -> DbResult<bool>;

    /// List every dependency edge of a model
    async fn list_dependency_edges(&self, model_id: ArtifactId) -> DbResult<Vec<DependencyEdge>>;

    /// Check whether a model already holds an edge of the given type
    async fn has_dependency_of_type(
        &self,
        model_id: ArtifactId,
        dependency_type: DependencyType,
    ) -> DbResult<bool> {
        Ok(self
            .list_dependency_edges(model_id)
            .await?
            .iter()
            .any(|e| e.dependency_type == dependency_type))
    }

    /// Insert a relationship edge unless it is already present
    ///
    /// # Returns
    /// * `Ok(true)` - The edge was inserted
    /// * `Ok(false)` - An identical edge already existed
    async fn insert_relationship_edge(&self, edge: &RelationshipEdge) -> DbResult<bool>;

    /// List relationship edges touching an artifact, in either direction
    async fn list_relationship_edges(&self, artifact_id: ArtifactId) -> DbResult<Vec<RelationshipEdge>>;

    /// Replace a model's stored score record
    ///
    /// # Returns
    /// * `Err(DbError::NotFound)` - If the artifact doesn't exist
    async fn update_score_record(&self, id: ArtifactId, record: &ScoreRecord) -> DbResult<()>;

    /// Delete an artifact together with its edges and score record
    ///
    /// # Returns
    /// * `Err(DbError::NotFound)` - If the artifact doesn't exist
    async fn delete_artifact(&self, id: ArtifactId) -> DbResult<()>;

    /// Health check - verify repository is operational
    async fn health_check(&self) -> DbResult<()>;
}
