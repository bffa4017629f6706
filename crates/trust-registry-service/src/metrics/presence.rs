use async_trait::async_trait;
use trust_registry_core::{DependencyType, MetricKind, MetricScore};

use super::{Metric, MetricContext};
use crate::error::{ServiceError, ServiceResult};

/// Binary presence of a linked dependency.
///
/// Scores 1.0 when the model holds at least one persisted edge of the
/// matching type and 0.0 otherwise. It never grades the linked artifact.
#[derive(Debug, Clone, Copy)]
pub struct DependencyPresenceMetric {
    kind: MetricKind,
    dependency_type: DependencyType,
}

impl DependencyPresenceMetric {
    pub fn dataset_quality() -> Self {
        Self {
            kind: MetricKind::DatasetQuality,
            dependency_type: DependencyType::Dataset,
        }
    }

    pub fn code_quality() -> Self {
        Self {
            kind: MetricKind::CodeQuality,
            dependency_type: DependencyType::Code,
        }
    }

    pub fn dependency_type(&self) -> DependencyType {
        self.dependency_type
    }
}

#[async_trait]
impl Metric for DependencyPresenceMetric {
    fn kind(&self) -> MetricKind {
        self.kind
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        let linked = ctx
            .repository
            .has_dependency_of_type(ctx.artifact.id, self.dependency_type)
            .await
            .map_err(|e| ServiceError::metric(self.kind, e.to_string()))?;

        Ok(MetricScore::scalar(if linked { 1.0 } else { 0.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trust_registry_core::{ArtifactKind, ArtifactMetadata, DependencyEdge, EdgeSource};
    use trust_registry_db::{ArtifactRepository, InMemoryArtifactRepository, NewArtifact};

    #[tokio::test]
    async fn test_presence_follows_persisted_edges() {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let model = repo
            .create_artifact(NewArtifact::new(
                ArtifactKind::Model,
                ArtifactMetadata::new("org/model", "model"),
            ))
            .await
            .unwrap();
        let dataset = repo
            .create_artifact(NewArtifact::new(
                ArtifactKind::Dataset,
                ArtifactMetadata::new("squad", "squad"),
            ))
            .await
            .unwrap();

        let ctx = MetricContext::new(model.clone(), repo.clone());
        let dataset_metric = DependencyPresenceMetric::dataset_quality();
        let code_metric = DependencyPresenceMetric::code_quality();
        assert_eq!(dataset_metric.compute(&ctx).await.unwrap(), MetricScore::Scalar(0.0));

        repo.insert_dependency_edge(&DependencyEdge::new(
            model.id,
            dataset.id,
            DependencyType::Dataset,
            EdgeSource::UserProvided,
        ))
        .await
        .unwrap();

        assert_eq!(dataset_metric.compute(&ctx).await.unwrap(), MetricScore::Scalar(1.0));
        assert_eq!(code_metric.compute(&ctx).await.unwrap(), MetricScore::Scalar(0.0));
    }
}
