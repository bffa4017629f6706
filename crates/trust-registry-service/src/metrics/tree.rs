use async_trait::async_trait;
use std::collections::BTreeSet;
use trust_registry_core::{ArtifactId, LineageParent, MetricKind, MetricScore};

use super::{Metric, MetricContext};
use crate::error::{ServiceError, ServiceResult};

/// Mean net score of the model's scored parents.
///
/// Parents are resolved lineage hints plus the `from` end of relationship
/// edges pointing at this model. Not applicable when no parent has a score.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeScoreMetric;

impl TreeScoreMetric {
    async fn parents(&self, ctx: &MetricContext) -> ServiceResult<BTreeSet<ArtifactId>> {
        let id = ctx.artifact.id;
        let mut parents: BTreeSet<ArtifactId> = ctx
            .metadata()
            .auto_lineage
            .iter()
            .filter_map(|hint| match hint.parent {
                LineageParent::Resolved(parent) => Some(parent),
                LineageParent::Placeholder(_) => None,
            })
            .collect();

        let edges = ctx
            .repository
            .list_relationship_edges(id)
            .await
            .map_err(|e| ServiceError::metric(MetricKind::TreeScore, e.to_string()))?;
        parents.extend(
            edges
                .iter()
                .filter(|e| e.to_artifact_id == id)
                .map(|e| e.from_artifact_id),
        );

        parents.remove(&id);
        Ok(parents)
    }
}

#[async_trait]
impl Metric for TreeScoreMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::TreeScore
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        let mut scores = Vec::new();
        for parent in self.parents(ctx).await? {
            let found = ctx
                .repository
                .find_by_id(parent)
                .await
                .map_err(|e| ServiceError::metric(MetricKind::TreeScore, e.to_string()))?;
            if let Some(record) = found.and_then(|a| a.score) {
                scores.push(record.net_score);
            }
        }

        if scores.is_empty() {
            return Ok(MetricScore::NotApplicable);
        }
        Ok(MetricScore::scalar(
            scores.iter().sum::<f64>() / scores.len() as f64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use trust_registry_core::{
        ArtifactKind, ArtifactMetadata, EdgeSource, LineageHint, RelationshipEdge,
        RelationshipType, ScoreRecord,
    };
    use trust_registry_db::{ArtifactRepository, InMemoryArtifactRepository, NewArtifact};

    fn scored(net: f64) -> ScoreRecord {
        let mut record = ScoreRecord::from_results(BTreeMap::new(), 0);
        record.net_score = net;
        record
    }

    #[tokio::test]
    async fn test_mean_of_scored_parents() {
        let repo = Arc::new(InMemoryArtifactRepository::new());
        let mut base = NewArtifact::new(ArtifactKind::Model, ArtifactMetadata::new("org/base", "base"));
        base.score = Some(scored(0.8));
        let base = repo.create_artifact(base).await.unwrap();

        let mut upstream =
            NewArtifact::new(ArtifactKind::Model, ArtifactMetadata::new("org/upstream", "upstream"));
        upstream.score = Some(scored(0.4));
        let upstream = repo.create_artifact(upstream).await.unwrap();

        let unscored = repo
            .create_artifact(NewArtifact::new(
                ArtifactKind::Model,
                ArtifactMetadata::new("org/other", "other"),
            ))
            .await
            .unwrap();

        let child_meta = ArtifactMetadata::builder("org/child", "child")
            .lineage_hint(LineageHint::new(
                LineageParent::Resolved(base.id),
                RelationshipType::BaseModel,
                "config.base_model",
            ))
            .lineage_hint(LineageHint::new(
                LineageParent::Placeholder("ghost/model".into()),
                RelationshipType::BaseModel,
                "config.base_model",
            ))
            .build_unchecked();
        let child = repo
            .create_artifact(NewArtifact::new(ArtifactKind::Model, child_meta))
            .await
            .unwrap();

        for parent in [upstream.id, unscored.id] {
            repo.insert_relationship_edge(&RelationshipEdge::new(
                parent,
                child.id,
                RelationshipType::TeacherModel,
                EdgeSource::UserProvided,
            ))
            .await
            .unwrap();
        }

        let ctx = MetricContext::new(child, repo.clone());
        let score = TreeScoreMetric.compute(&ctx).await.unwrap();
        let value = score.as_scalar().unwrap();
        assert!((value - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_not_applicable_without_parents() {
        let ctx = crate::metrics::test_support::empty_context();
        let score = TreeScoreMetric.compute(&ctx).await.unwrap();
        assert!(score.is_not_applicable());
    }
}
