//! Ingestion service
//!
//! Entry point for new artifacts and user-provided edges. Ingesting a model
//! fills its dependency expectations and lineage hints (once, only when the
//! caller did not supply them), stores it, persists relationship edges to
//! resolved parents and scores it. Ingesting a dataset or code artifact
//! stores it and runs dependency resolution.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, ArtifactMetadata, DependencyEdge, DependencyType,
    EdgeSource, LineageHint, LineageParent, MetricKind, RelationshipEdge, RelationshipType,
    ScoreRecord,
};
use trust_registry_db::{ArtifactRepository, NewArtifact};

use crate::error::{ServiceError, ServiceResult};
use crate::extraction::{extract_or_empty, parent_references, HintExtractor};
use crate::resolver::{DependencyResolver, ResolutionOutcome, ResolutionRequest};
use crate::scoring::ScoreAggregator;

/// Result of ingesting one artifact
#[derive(Debug, Clone)]
pub struct IngestionReport {
    /// The stored artifact, including its score record for models
    pub artifact: Artifact,
    /// Auto-discovered relationship edges persisted for a model
    pub relationships_created: usize,
    /// Dependency resolution outcome for datasets and code
    pub resolution: Option<ResolutionOutcome>,
}

impl IngestionReport {
    pub fn score(&self) -> Option<&ScoreRecord> {
        self.artifact.score.as_ref()
    }
}

/// Trait for ingestion operations
#[async_trait]
pub trait IngestionService: Send + Sync {
    /// Store a new artifact and run scoring or dependency resolution
    ///
    /// # Returns
    /// * `Ok(IngestionReport)` - What was stored and linked
    /// * `Err(ServiceError::ValidationFailed)` - If the metadata is invalid
    async fn ingest(&self, kind: ArtifactKind, metadata: ArtifactMetadata) -> ServiceResult<IngestionReport>;

    /// Persist a user-provided lineage edge between two models
    ///
    /// # Returns
    /// * `Ok(true)` - The edge was created
    /// * `Ok(false)` - An identical edge already existed
    async fn record_relationship(
        &self,
        from: ArtifactId,
        to: ArtifactId,
        relationship: RelationshipType,
    ) -> ServiceResult<bool>;

    /// Persist a user-provided dependency edge and refresh the model's
    /// presence metrics
    ///
    /// # Returns
    /// * `Ok(true)` - The edge was created
    /// * `Ok(false)` - The model already holds an edge of this type
    async fn record_dependency(&self, model_id: ArtifactId, artifact_id: ArtifactId) -> ServiceResult<bool>;

    /// Rerun every metric for a stored model and persist the record
    async fn rescore(&self, model_id: ArtifactId) -> ServiceResult<ScoreRecord>;
}

/// Default implementation of IngestionService
pub struct DefaultIngestionService {
    repository: Arc<dyn ArtifactRepository>,
    aggregator: Arc<dyn ScoreAggregator>,
    resolver: Arc<dyn DependencyResolver>,
    extractor: Arc<dyn HintExtractor>,
}

impl DefaultIngestionService {
    pub fn new(
        repository: Arc<dyn ArtifactRepository>,
        aggregator: Arc<dyn ScoreAggregator>,
        resolver: Arc<dyn DependencyResolver>,
        extractor: Arc<dyn HintExtractor>,
    ) -> Self {
        Self {
            repository,
            aggregator,
            resolver,
            extractor,
        }
    }

    async fn load(&self, id: ArtifactId) -> ServiceResult<Artifact> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("artifact {}", id)))
    }

    async fn load_model(&self, id: ArtifactId) -> ServiceResult<Artifact> {
        let artifact = self.load(id).await?;
        artifact.require_kind(ArtifactKind::Model)?;
        Ok(artifact)
    }

    /// Fill expectations and lineage hints the caller left empty
    async fn enrich_model(&self, metadata: &mut ArtifactMetadata) {
        if metadata.expected_dependencies.is_none() {
            let hints = extract_or_empty(self.extractor.as_ref(), metadata.readme_text()).await;
            debug!(
                datasets = hints.training_datasets.len() + hints.eval_datasets.len(),
                code = hints.code_repositories.len(),
                "Extracted dependency expectations"
            );
            metadata.expected_dependencies = Some(hints);
        }

        if metadata.auto_lineage.is_empty() {
            for reference in parent_references(&metadata.config, metadata.readme_text()) {
                let own = reference.name.eq_ignore_ascii_case(&metadata.identifier)
                    || reference.name.eq_ignore_ascii_case(&metadata.name);
                if own {
                    continue;
                }
                let parent = match self.resolve_parent(&reference.name).await {
                    Some(id) => LineageParent::Resolved(id),
                    None => LineageParent::Placeholder(reference.name.clone()),
                };
                metadata.auto_lineage.push(LineageHint::new(
                    parent,
                    reference.relationship,
                    reference.source,
                ));
            }
        }
    }

    /// Find a stored model by name, or by the last path segment of an
    /// `org/name` identifier
    async fn resolve_parent(&self, reference: &str) -> Option<ArtifactId> {
        let mut names = vec![reference];
        if let Some((_, short)) = reference.rsplit_once('/') {
            names.push(short);
        }

        let mut candidates = Vec::new();
        for name in names {
            match self.repository.find_by_name(name).await {
                Ok(found) => candidates.extend(found.into_iter().filter(Artifact::is_model)),
                Err(e) => {
                    warn!(parent = reference, error = %e, "Failed to look up lineage parent");
                    return None;
                }
            }
        }

        candidates
            .iter()
            .find(|a| a.metadata.identifier.eq_ignore_ascii_case(reference))
            .or_else(|| {
                candidates
                    .iter()
                    .find(|a| a.metadata.name.eq_ignore_ascii_case(reference))
            })
            .or_else(|| candidates.first())
            .map(|a| a.id)
    }

    /// Persist relationship edges to every resolved parent
    async fn persist_lineage(&self, model: &Artifact) -> usize {
        let mut created = 0;
        for hint in &model.metadata.auto_lineage {
            let LineageParent::Resolved(parent) = hint.parent else {
                continue;
            };
            if parent == model.id {
                continue;
            }
            let edge = RelationshipEdge::new(
                parent,
                model.id,
                hint.relationship.clone(),
                EdgeSource::AutoDiscovered,
            );
            match self.repository.insert_relationship_edge(&edge).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(parent = %parent, child = %model.id, error = %e, "Failed to persist relationship edge")
                }
            }
        }
        created
    }

    async fn score_and_store(&self, model: &Artifact) -> ServiceResult<ScoreRecord> {
        let record = self.aggregator.compute_all(model).await;
        self.repository.update_score_record(model.id, &record).await?;
        Ok(record)
    }
}

#[async_trait]
impl IngestionService for DefaultIngestionService {
    #[instrument(skip(self, metadata), fields(kind = %kind, name = %metadata.name))]
    async fn ingest(&self, kind: ArtifactKind, mut metadata: ArtifactMetadata) -> ServiceResult<IngestionReport> {
        metadata
            .validate()
            .map_err(|e| ServiceError::ValidationFailed(format!("Invalid metadata: {}", e)))?;

        if kind == ArtifactKind::Model {
            self.enrich_model(&mut metadata).await;
        }

        let mut artifact = self
            .repository
            .create_artifact(NewArtifact::new(kind, metadata))
            .await?;
        info!(artifact_id = %artifact.id, "Artifact stored");

        let mut report = IngestionReport {
            relationships_created: 0,
            resolution: None,
            artifact: artifact.clone(),
        };

        match kind {
            ArtifactKind::Model => {
                report.relationships_created = self.persist_lineage(&artifact).await;
                artifact.score = Some(self.score_and_store(&artifact).await?);
                report.artifact = artifact;
            }
            ArtifactKind::Dataset | ArtifactKind::Code => {
                let request = ResolutionRequest::from_artifact(&artifact);
                report.resolution = Some(self.resolver.resolve_dependencies(request).await);
            }
        }

        Ok(report)
    }

    #[instrument(skip(self))]
    async fn record_relationship(
        &self,
        from: ArtifactId,
        to: ArtifactId,
        relationship: RelationshipType,
    ) -> ServiceResult<bool> {
        if from == to {
            return Err(ServiceError::ValidationFailed(
                "a model cannot be its own parent".to_string(),
            ));
        }
        self.load_model(from).await?;
        self.load_model(to).await?;

        let edge = RelationshipEdge::new(from, to, relationship, EdgeSource::UserProvided);
        Ok(self.repository.insert_relationship_edge(&edge).await?)
    }

    #[instrument(skip(self))]
    async fn record_dependency(&self, model_id: ArtifactId, artifact_id: ArtifactId) -> ServiceResult<bool> {
        self.load_model(model_id).await?;
        let artifact = self.load(artifact_id).await?;
        let dependency_type = DependencyType::for_kind(artifact.kind).ok_or_else(|| {
            ServiceError::InvalidType(format!(
                "artifact {} is a model and cannot be a dependency",
                artifact_id
            ))
        })?;

        if self
            .repository
            .has_dependency_of_type(model_id, dependency_type)
            .await?
        {
            debug!("Model already holds a {} edge", dependency_type.as_str());
            return Ok(false);
        }

        let edge = DependencyEdge::new(model_id, artifact_id, dependency_type, EdgeSource::UserProvided);
        let inserted = self.repository.insert_dependency_edge(&edge).await?;
        if inserted {
            if let Err(e) = self
                .aggregator
                .recompute_subset(model_id, &MetricKind::DEPENDENCY_PRESENCE)
                .await
            {
                warn!(error = %e, "Failed to recompute presence metrics");
            }
        }
        Ok(inserted)
    }

    #[instrument(skip(self))]
    async fn rescore(&self, model_id: ArtifactId) -> ServiceResult<ScoreRecord> {
        let model = self.load_model(model_id).await?;
        self.score_and_store(&model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::RuleBasedExtractor;
    use crate::resolver::DefaultDependencyResolver;
    use crate::scoring::DefaultScoreAggregator;
    use serde_json::json;
    use trust_registry_db::InMemoryArtifactRepository;

    fn service() -> (Arc<InMemoryArtifactRepository>, DefaultIngestionService) {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let extractor: Arc<dyn HintExtractor> = Arc::new(RuleBasedExtractor::new().unwrap());
        let aggregator: Arc<dyn ScoreAggregator> = Arc::new(DefaultScoreAggregator::new(repo.clone()));
        let resolver = Arc::new(DefaultDependencyResolver::new(
            repo.clone(),
            aggregator.clone(),
            extractor.clone(),
        ));
        let service = DefaultIngestionService::new(repo.clone(), aggregator, resolver, extractor);
        (repo, service)
    }

    #[tokio::test]
    async fn test_model_ingest_scores_and_extracts() {
        let (repo, service) = service();
        let metadata = ArtifactMetadata::builder("org/qa", "qa")
            .license("MIT")
            .readme("Fine-tuned on SQuAD. Code at https://github.com/org/qa-train")
            .build_unchecked();

        let report = service.ingest(ArtifactKind::Model, metadata).await.unwrap();
        let score = report.score().unwrap();
        assert_eq!(score.value_of(MetricKind::License), Some(1.0));
        assert_eq!(score.metrics.len(), MetricKind::ALL.len());

        let stored = repo.find_by_id(report.artifact.id).await.unwrap().unwrap();
        let expectations = stored.expectations();
        assert_eq!(expectations.training_datasets[0].name, "SQuAD");
        assert_eq!(expectations.code_repositories.len(), 1);
        assert_eq!(stored.score.as_ref(), Some(score));
    }

    #[tokio::test]
    async fn test_caller_expectations_are_kept() {
        let (repo, service) = service();
        let metadata = ArtifactMetadata::builder("org/m", "m")
            .readme("Trained on C4.")
            .expected_dependencies(Default::default())
            .build_unchecked();
        let report = service.ingest(ArtifactKind::Model, metadata).await.unwrap();
        let stored = repo.find_by_id(report.artifact.id).await.unwrap().unwrap();
        assert!(stored.expectations().is_empty());
    }

    #[tokio::test]
    async fn test_lineage_hints_resolve_against_stored_models() {
        let (repo, service) = service();
        let base = service
            .ingest(
                ArtifactKind::Model,
                ArtifactMetadata::new("meta-llama/Llama-2-7b", "Llama-2-7b"),
            )
            .await
            .unwrap()
            .artifact;

        let child_meta = ArtifactMetadata::builder("org/llama-chat", "llama-chat")
            .config(json!({
                "base_model": "meta-llama/Llama-2-7b",
                "teacher_model": "unknown/distil-source",
                "_name_or_path": "org/llama-chat",
            }))
            .build_unchecked();
        let report = service.ingest(ArtifactKind::Model, child_meta).await.unwrap();

        assert_eq!(report.relationships_created, 1);
        let hints = &report.artifact.metadata.auto_lineage;
        assert_eq!(hints.len(), 2);
        assert_eq!(hints[0].parent, LineageParent::Resolved(base.id));
        assert_eq!(hints[1].parent, LineageParent::Placeholder("unknown/distil-source".into()));

        let edges = repo.list_relationship_edges(base.id).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, EdgeSource::AutoDiscovered);
    }

    #[tokio::test]
    async fn test_invalid_metadata_rejected() {
        let (_, service) = service();
        let result = service
            .ingest(ArtifactKind::Dataset, ArtifactMetadata::new("x", ""))
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_user_provided_edges() {
        let (repo, service) = service();
        let model = service
            .ingest(ArtifactKind::Model, ArtifactMetadata::new("org/m", "m"))
            .await
            .unwrap()
            .artifact;
        let other = service
            .ingest(ArtifactKind::Model, ArtifactMetadata::new("org/n", "n"))
            .await
            .unwrap()
            .artifact;
        let code = service
            .ingest(ArtifactKind::Code, ArtifactMetadata::new("org/tool", "tool"))
            .await
            .unwrap()
            .artifact;

        assert!(service
            .record_relationship(other.id, model.id, RelationshipType::DerivedFrom)
            .await
            .unwrap());
        assert!(matches!(
            service
                .record_relationship(code.id, model.id, RelationshipType::DerivedFrom)
                .await,
            Err(ServiceError::InvalidType(_))
        ));
        assert!(matches!(
            service
                .record_relationship(model.id, model.id, RelationshipType::DerivedFrom)
                .await,
            Err(ServiceError::ValidationFailed(_))
        ));

        assert!(service.record_dependency(model.id, code.id).await.unwrap());
        assert!(!service.record_dependency(model.id, code.id).await.unwrap());
        assert!(matches!(
            service.record_dependency(model.id, other.id).await,
            Err(ServiceError::InvalidType(_))
        ));

        let stored = repo.find_by_id(model.id).await.unwrap().unwrap();
        assert_eq!(stored.score.unwrap().value_of(MetricKind::CodeQuality), Some(1.0));
    }

    #[tokio::test]
    async fn test_rescore() {
        let (_, service) = service();
        let model = service
            .ingest(ArtifactKind::Model, ArtifactMetadata::new("org/m", "m"))
            .await
            .unwrap()
            .artifact;
        let record = service.rescore(model.id).await.unwrap();
        assert_eq!(record.metrics.len(), MetricKind::ALL.len());
        assert!(matches!(
            service.rescore(ArtifactId::new(77)).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
