use async_trait::async_trait;
use trust_registry_core::{ArtifactMetadata, MetricKind, MetricScore};

use super::{Metric, MetricContext};
use crate::error::ServiceResult;

/// Share of the linked code repository's changes that went through review
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewednessMetric;

impl ReviewednessMetric {
    pub fn score(metadata: &ArtifactMetadata) -> MetricScore {
        let linked = metadata
            .code_repository
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if !linked {
            return MetricScore::NotApplicable;
        }

        match metadata.review_stats {
            Some(stats) if stats.total_changes > 0 => {
                MetricScore::scalar(stats.reviewed_changes as f64 / stats.total_changes as f64)
            }
            _ => MetricScore::zero(),
        }
    }
}

#[async_trait]
impl Metric for ReviewednessMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::Reviewedness
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        Ok(Self::score(ctx.metadata()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_applicable_without_repository() {
        assert!(ReviewednessMetric::score(&ArtifactMetadata::default()).is_not_applicable());
    }

    #[test]
    fn test_fraction_of_reviewed_changes() {
        let metadata = ArtifactMetadata::builder("org/m", "m")
            .code_repository("https://github.com/org/m")
            .review_stats(15, 20)
            .build_unchecked();
        assert_eq!(ReviewednessMetric::score(&metadata), MetricScore::Scalar(0.75));
    }

    #[test]
    fn test_zero_without_stats() {
        let metadata = ArtifactMetadata::builder("org/m", "m")
            .code_repository("https://github.com/org/m")
            .build_unchecked();
        assert_eq!(ReviewednessMetric::score(&metadata), MetricScore::Scalar(0.0));
    }
}
