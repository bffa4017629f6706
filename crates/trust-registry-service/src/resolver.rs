//! Dependency resolution
//!
//! When a dataset or code artifact is ingested, the resolver scans every
//! stored model's [`DependencyExpectation`] and links the new artifact to the
//! models that expected it. A model holds at most one dataset edge and one
//! code edge; the first link wins and later candidates are skipped.
//!
//! Code artifacts additionally cascade: the datasets named in the code's own
//! README are matched against stored dataset artifacts and linked to every
//! model the code itself was just linked to.
//!
//! Resolution never fails. Persistence errors for one candidate are logged
//! and the scan continues; extraction errors degrade to no mentions.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, DependencyEdge, DependencyExpectation, DependencyType,
    EdgeSource, IdentifierMatcher, MetricKind, DEFAULT_MATCH_THRESHOLD,
};
use trust_registry_db::ArtifactRepository;

use crate::extraction::{extract_or_empty, HintExtractor};
use crate::scoring::ScoreAggregator;

/// A newly ingested artifact to resolve against the stored models
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub artifact_id: ArtifactId,
    pub kind: ArtifactKind,
    pub name: String,
    pub source_url: Option<String>,
    pub readme: String,
}

impl ResolutionRequest {
    pub fn from_artifact(artifact: &Artifact) -> Self {
        Self {
            artifact_id: artifact.id,
            kind: artifact.kind,
            name: artifact.metadata.name.clone(),
            source_url: artifact.metadata.source_url.clone(),
            readme: artifact.metadata.readme_text().to_string(),
        }
    }
}

/// What a resolution run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionOutcome {
    /// Models newly linked to the ingested artifact
    pub linked: Vec<ArtifactId>,
    /// Edges created by the code-to-dataset cascade
    pub cascaded: Vec<DependencyEdge>,
    /// Models that matched but already held an edge of this type
    pub skipped_at_cap: Vec<ArtifactId>,
    /// Models whose presence metrics were recomputed
    pub recomputed: Vec<ArtifactId>,
    /// Absorbed persistence or recompute failures
    pub failures: usize,
}

impl ResolutionOutcome {
    /// Every model that gained an edge
    pub fn touched_models(&self) -> BTreeSet<ArtifactId> {
        self.linked
            .iter()
            .copied()
            .chain(self.cascaded.iter().map(|e| e.model_id))
            .collect()
    }

    pub fn created_edges(&self) -> usize {
        self.linked.len() + self.cascaded.len()
    }
}

/// Trait for dependency resolution
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Link a newly ingested dataset or code artifact to the models that expect it
    async fn resolve_dependencies(&self, request: ResolutionRequest) -> ResolutionOutcome;
}

/// Default implementation of DependencyResolver
pub struct DefaultDependencyResolver {
    repository: Arc<dyn ArtifactRepository>,
    aggregator: Arc<dyn ScoreAggregator>,
    extractor: Arc<dyn HintExtractor>,
    matcher: IdentifierMatcher,
    threshold: f64,
}

/// Result of trying to add one edge
enum LinkAttempt {
    Linked,
    AtCap,
    Failed,
}

impl DefaultDependencyResolver {
    pub fn new(
        repository: Arc<dyn ArtifactRepository>,
        aggregator: Arc<dyn ScoreAggregator>,
        extractor: Arc<dyn HintExtractor>,
    ) -> Self {
        Self {
            repository,
            aggregator,
            extractor,
            matcher: IdentifierMatcher::new(),
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    /// Minimum matcher score for a link
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Match score of the ingested artifact against one model's expectations
    fn match_score(
        &self,
        request: &ResolutionRequest,
        expectations: &DependencyExpectation,
        code_mentions: &[String],
    ) -> f64 {
        let url = request.source_url.as_deref();
        match request.kind {
            ArtifactKind::Dataset => {
                self.matcher
                    .best_score(&request.name, url, expectations.dataset_identifiers())
            }
            ArtifactKind::Code => {
                let direct = self
                    .matcher
                    .best_score(&request.name, url, expectations.code_identifiers());
                let via_mentions = code_mentions
                    .iter()
                    .map(|mention| {
                        self.matcher
                            .best_score(mention, None, expectations.dataset_identifiers())
                    })
                    .fold(0.0, f64::max);
                direct.max(via_mentions)
            }
            ArtifactKind::Model => 0.0,
        }
    }

    fn expects_anything(
        kind: ArtifactKind,
        expectations: &DependencyExpectation,
        code_mentions: &[String],
    ) -> bool {
        match kind {
            ArtifactKind::Dataset => expectations.expects_datasets(),
            ArtifactKind::Code => {
                expectations.expects_code()
                    || (expectations.expects_datasets() && !code_mentions.is_empty())
            }
            ArtifactKind::Model => false,
        }
    }

    /// Insert one edge, honouring the one-per-type cap
    async fn link(&self, edge: &DependencyEdge) -> LinkAttempt {
        match self
            .repository
            .has_dependency_of_type(edge.model_id, edge.dependency_type)
            .await
        {
            Ok(true) => {
                debug!(model_id = %edge.model_id, "Model already holds a {} edge", edge.dependency_type.as_str());
                return LinkAttempt::AtCap;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(model_id = %edge.model_id, error = %e, "Failed to read dependency edges");
                return LinkAttempt::Failed;
            }
        }

        match self.repository.insert_dependency_edge(edge).await {
            Ok(true) => LinkAttempt::Linked,
            Ok(false) => LinkAttempt::AtCap,
            Err(e) => {
                warn!(
                    model_id = %edge.model_id,
                    artifact_id = %edge.artifact_id,
                    error = %e,
                    "Failed to persist dependency edge"
                );
                LinkAttempt::Failed
            }
        }
    }

    /// Dataset names mentioned by a code artifact's README
    async fn code_mentions(&self, request: &ResolutionRequest) -> Vec<String> {
        if request.kind != ArtifactKind::Code {
            return Vec::new();
        }
        let hints = extract_or_empty(self.extractor.as_ref(), &request.readme).await;
        let mut mentions: Vec<String> = Vec::new();
        for identifier in hints.dataset_identifiers() {
            if !mentions.iter().any(|m| m.eq_ignore_ascii_case(identifier)) {
                mentions.push(identifier.to_string());
            }
        }
        mentions
    }

    /// Link matching stored datasets to the models the code was linked to
    async fn cascade(
        &self,
        code_mentions: &[String],
        linked_models: &[ArtifactId],
        outcome: &mut ResolutionOutcome,
    ) {
        let datasets = match self.repository.list_by_kind(ArtifactKind::Dataset).await {
            Ok(datasets) => datasets,
            Err(e) => {
                warn!(error = %e, "Failed to list datasets for cascade");
                outcome.failures += 1;
                return;
            }
        };

        for dataset in datasets {
            let url = dataset.source_url();
            let matched = code_mentions
                .iter()
                .any(|m| self.matcher.score(dataset.name(), url, m) >= self.threshold);
            if !matched {
                continue;
            }

            for model_id in linked_models {
                let edge = DependencyEdge::new(
                    *model_id,
                    dataset.id,
                    DependencyType::Dataset,
                    EdgeSource::CascadedFromCode,
                );
                match self.link(&edge).await {
                    LinkAttempt::Linked => {
                        debug!(model_id = %model_id, dataset_id = %dataset.id, "Cascaded dataset link");
                        outcome.cascaded.push(edge);
                    }
                    LinkAttempt::AtCap => {}
                    LinkAttempt::Failed => outcome.failures += 1,
                }
            }
        }
    }
}

#[async_trait]
impl DependencyResolver for DefaultDependencyResolver {
    #[instrument(skip(self, request), fields(artifact_id = %request.artifact_id, kind = %request.kind, name = %request.name))]
    async fn resolve_dependencies(&self, request: ResolutionRequest) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::default();

        let Some(dependency_type) = DependencyType::for_kind(request.kind) else {
            debug!("Models are not dependencies, nothing to resolve");
            return outcome;
        };

        let models = match self.repository.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!(error = %e, "Failed to list models, skipping resolution");
                outcome.failures += 1;
                return outcome;
            }
        };

        let code_mentions = self.code_mentions(&request).await;

        // Primary pass
        for model in &models {
            let expectations = model.expectations();
            if !Self::expects_anything(request.kind, &expectations, &code_mentions) {
                continue;
            }

            let score = self.match_score(&request, &expectations, &code_mentions);
            if score < self.threshold {
                debug!(model_id = %model.id, score, "Below match threshold");
                continue;
            }

            let edge = DependencyEdge::new(
                model.id,
                request.artifact_id,
                dependency_type,
                EdgeSource::AutoDiscovered,
            );
            match self.link(&edge).await {
                LinkAttempt::Linked => {
                    info!(model_id = %model.id, score, "Linked {} to model", dependency_type.as_str());
                    outcome.linked.push(model.id);
                }
                LinkAttempt::AtCap => outcome.skipped_at_cap.push(model.id),
                LinkAttempt::Failed => outcome.failures += 1,
            }
        }

        // Cascade runs only after the primary pass is complete
        if request.kind == ArtifactKind::Code
            && !outcome.linked.is_empty()
            && !code_mentions.is_empty()
        {
            let linked = outcome.linked.clone();
            self.cascade(&code_mentions, &linked, &mut outcome).await;
        }

        for model_id in outcome.touched_models() {
            match self
                .aggregator
                .recompute_subset(model_id, &MetricKind::DEPENDENCY_PRESENCE)
                .await
            {
                Ok(_) => outcome.recomputed.push(model_id),
                Err(e) => {
                    warn!(model_id = %model_id, error = %e, "Failed to recompute presence metrics");
                    outcome.failures += 1;
                }
            }
        }

        info!(
            linked = outcome.linked.len(),
            cascaded = outcome.cascaded.len(),
            failures = outcome.failures,
            "Dependency resolution complete"
        );
        outcome
    }
}
