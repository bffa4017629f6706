use async_trait::async_trait;
use trust_registry_core::score::clamp_unit;
use trust_registry_core::{ArtifactMetadata, MetricKind, MetricScore};

use super::{contains_any, Metric, MetricContext};
use crate::error::ServiceResult;

/// How quickly a newcomer can start using the artifact
#[derive(Debug, Clone, Copy, Default)]
pub struct RampUpMetric;

impl RampUpMetric {
    pub fn score(metadata: &ArtifactMetadata) -> f64 {
        let readme = metadata.readme_text();
        let has_readme = !readme.trim().is_empty();
        let has_description = !metadata.description_text().trim().is_empty();
        let has_tags = !metadata.tags.is_empty();

        let mut base: f64 = 0.0;
        if has_readme {
            base += 0.20;
        }
        if has_description {
            base += 0.07;
        }
        if has_tags {
            base += 0.04;
        }

        clamp_unit(base.min(0.30) + readme_quality(readme) * 0.50 + card_completeness(metadata) * 0.25)
    }
}

fn readme_quality(readme: &str) -> f64 {
    if readme.trim().is_empty() {
        return 0.0;
    }
    let lowered = readme.to_lowercase();
    let mut score = 0.30;

    if contains_any(&lowered, &["usage", "how to use"]) {
        score += 0.25;
    }
    if contains_any(&lowered, &["example", "```"]) {
        score += 0.25;
    }
    if contains_any(&lowered, &["install", "pip"]) {
        score += 0.15;
    }
    if contains_any(&lowered, &["quickstart", "getting started", "setup", "model"]) {
        score += 0.10;
    }
    if readme.len() > 200 {
        score += 0.10;
    }
    f64::min(score, 1.0)
}

fn card_completeness(metadata: &ArtifactMetadata) -> f64 {
    let mut score: f64 = 0.0;
    if !metadata.description_text().trim().is_empty() {
        score += 0.7;
    }
    if !metadata.datasets.is_empty() {
        score += 0.2;
    }
    if !metadata.tags.is_empty() {
        score += 0.1;
    }
    score.min(1.0)
}

#[async_trait]
impl Metric for RampUpMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::RampUpTime
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        Ok(MetricScore::scalar(Self::score(ctx.metadata())))
    }
}
