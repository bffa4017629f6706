//! Common test utilities and helpers
//!
//! Integration tests run the full service stack over the in-memory
//! repository. [`FlakyRepository`] wraps it to inject persistence failures.

#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, ArtifactMetadata, DependencyEdge, RelationshipEdge,
    ScoreRecord,
};
use trust_registry_db::{ArtifactRepository, DbError, DbResult, InMemoryArtifactRepository, NewArtifact};
use trust_registry_service::ServiceRegistry;

pub mod fixtures;

/// Test application state
pub struct TestApp {
    pub repository: Arc<FlakyRepository>,
    pub services: ServiceRegistry,
}

impl TestApp {
    /// Create a registry over a fresh in-memory store
    pub fn new() -> Result<Self> {
        let repository = Arc::new(FlakyRepository::new());
        let services =
            ServiceRegistry::new(repository.clone()).context("Failed to create services")?;
        Ok(Self {
            repository,
            services,
        })
    }

    pub async fn ingest(&self, kind: ArtifactKind, metadata: ArtifactMetadata) -> Result<Artifact> {
        let report = self
            .services
            .ingestion()
            .ingest(kind, metadata)
            .await
            .with_context(|| format!("Failed to ingest {}", kind))?;
        Ok(report.artifact)
    }

    pub async fn stored(&self, id: ArtifactId) -> Result<Artifact> {
        self.repository
            .find_by_id(id)
            .await?
            .with_context(|| format!("artifact {} missing", id))
    }

    pub async fn dependency_edges(&self, model_id: ArtifactId) -> Result<Vec<DependencyEdge>> {
        Ok(self.repository.list_dependency_edges(model_id).await?)
    }
}

/// In-memory repository whose dependency-edge inserts can be made to fail,
/// either all of them or only those for chosen models
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryArtifactRepository,
    fail_dependency_inserts: AtomicBool,
    failing_models: Mutex<Vec<ArtifactId>>,
    failed_inserts: AtomicUsize,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_dependency_inserts(&self, fail: bool) {
        self.fail_dependency_inserts.store(fail, Ordering::SeqCst);
    }

    /// Fail only the dependency inserts whose model is `model_id`
    pub fn fail_dependency_inserts_for(&self, model_id: ArtifactId) {
        if let Ok(mut models) = self.failing_models.lock() {
            models.push(model_id);
        }
    }

    fn should_fail(&self, edge: &DependencyEdge) -> bool {
        self.fail_dependency_inserts.load(Ordering::SeqCst)
            || self
                .failing_models
                .lock()
                .map(|models| models.contains(&edge.model_id))
                .unwrap_or(false)
    }

    pub fn failed_inserts(&self) -> usize {
        self.failed_inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactRepository for FlakyRepository {
    async fn create_artifact(&self, artifact: NewArtifact) -> DbResult<Artifact> {
        self.inner.create_artifact(artifact).await
    }

    async fn find_by_id(&self, id: ArtifactId) -> DbResult<Option<Artifact>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> DbResult<Vec<Artifact>> {
        self.inner.find_by_name(name).await
    }

    async fn list_by_kind(&self, kind: ArtifactKind) -> DbResult<Vec<Artifact>> {
        self.inner.list_by_kind(kind).await
    }

    async fn insert_dependency_edge(&self, edge: &DependencyEdge) -> DbResult<bool> {
        if self.should_fail(edge) {
            self.failed_inserts.fetch_add(1, Ordering::SeqCst);
            return Err(DbError::Connection("connection reset".to_string()));
        }
        self.inner.insert_dependency_edge(edge).await
    }

    async fn list_dependency_edges(&self, model_id: ArtifactId) -> DbResult<Vec<DependencyEdge>> {
        self.inner.list_dependency_edges(model_id).await
    }

    async fn insert_relationship_edge(&self, edge: &RelationshipEdge) -> DbResult<bool> {
        self.inner.insert_relationship_edge(edge).await
    }

    async fn list_relationship_edges(&self, artifact_id: ArtifactId) -> DbResult<Vec<RelationshipEdge>> {
        self.inner.list_relationship_edges(artifact_id).await
    }

    async fn update_score_record(&self, id: ArtifactId, record: &ScoreRecord) -> DbResult<()> {
        self.inner.update_score_record(id, record).await
    }

    async fn delete_artifact(&self, id: ArtifactId) -> DbResult<()> {
        self.inner.delete_artifact(id).await
    }

    async fn health_check(&self) -> DbResult<()> {
        self.inner.health_check().await
    }
}
