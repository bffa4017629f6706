use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trust_registry_core::score::clamp_unit;
use trust_registry_core::{ArtifactMetadata, MetricKind, MetricScore};

use super::{Metric, MetricContext};
use crate::error::ServiceResult;

const KNOWN_ORGANIZATIONS: &[&str] = &[
    "google",
    "microsoft",
    "facebook",
    "meta",
    "openai",
    "anthropic",
    "huggingface",
    "stanford",
    "mit",
    "berkeley",
    "research",
    "ai",
    "deepmind",
    "nvidia",
    "apple",
];

const ORGANIZATION_INDICATORS: &[&str] = &[
    "team", "lab", "corp", "inc", "ltd", "research", "ai", "institute",
];

/// Knowledge-concentration risk; higher means safer
#[derive(Debug, Clone, Copy, Default)]
pub struct BusFactorMetric {
    now: Option<DateTime<Utc>>,
}

impl BusFactorMetric {
    pub fn new() -> Self {
        Self { now: None }
    }

    /// Evaluate recency against a fixed clock
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }

    pub fn score(&self, metadata: &ArtifactMetadata) -> f64 {
        let now = self.now.unwrap_or_else(Utc::now);
        clamp_unit(
            0.2 + organization(metadata) * 0.2
                + contributors(metadata.contributors_count) * 0.5
                + recency(metadata.last_modified, now) * 0.3,
        )
    }
}

/// Tokens of the author and identifier, split on anything non-alphanumeric
fn owner_tokens(metadata: &ArtifactMetadata) -> Vec<String> {
    let text = format!(
        "{} {}",
        metadata.author.as_deref().unwrap_or_default(),
        metadata.identifier
    )
    .to_lowercase();
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A known organisation owns a token when it is the whole token or closes a
/// compound such as `allenai`; `mitchell` does not belong to `mit`
fn is_known_organization(token: &str) -> bool {
    KNOWN_ORGANIZATIONS
        .iter()
        .any(|org| token == *org || token.ends_with(org))
}

fn organization(metadata: &ArtifactMetadata) -> f64 {
    let tokens = owner_tokens(metadata);
    if tokens.iter().any(|t| is_known_organization(t)) {
        1.0
    } else if tokens.iter().any(|t| {
        ORGANIZATION_INDICATORS
            .iter()
            .any(|ind| t == ind || t.ends_with(ind))
    }) {
        0.8
    } else {
        0.5
    }
}

fn contributors(count: Option<u32>) -> f64 {
    match count.unwrap_or(0) {
        n if n >= 10 => 1.0,
        n if n >= 6 => 0.8,
        n if n >= 3 => 0.6,
        n if n >= 1 => 0.4,
        _ => 0.3,
    }
}

fn recency(last_modified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(at) = last_modified else {
        return 0.3;
    };
    match (now - at).num_days() {
        d if d <= 30 => 1.0,
        d if d <= 90 => 0.7,
        d if d <= 365 => 0.4,
        _ => 0.1,
    }
}

#[async_trait]
impl Metric for BusFactorMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::BusFactor
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        Ok(MetricScore::scalar(self.score(ctx.metadata())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_everything() {
        let metadata = ArtifactMetadata::new("someone/model", "model");
        // 0.2 + 0.5*0.2 + 0.3*0.5 + 0.3*0.3
        let score = BusFactorMetric::at(now()).score(&metadata);
        assert!((score - 0.54).abs() < 1e-9);
    }

    #[test]
    fn test_active_organization() {
        let metadata = ArtifactMetadata::builder("google/flan-t5", "flan-t5")
            .contributors_count(12)
            .last_modified(now() - Duration::days(3))
            .build_unchecked();
        assert!((BusFactorMetric::at(now()).score(&metadata) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_org_indicator_and_stale() {
        let metadata = ArtifactMetadata::builder("visionlab/detector", "detector")
            .contributors_count(4)
            .last_modified(now() - Duration::days(400))
            .build_unchecked();
        let expected = 0.2 + 0.8 * 0.2 + 0.6 * 0.5 + 0.1 * 0.3;
        assert!((BusFactorMetric::at(now()).score(&metadata) - expected).abs() < 1e-9);
    }

    fn owned_by(author: &str, identifier: &str) -> ArtifactMetadata {
        ArtifactMetadata::builder(identifier, "model")
            .author(author)
            .build_unchecked()
    }

    #[test]
    fn test_known_organizations_match_whole_or_trailing_tokens() {
        assert_eq!(organization(&owned_by("allenai", "allenai/longformer")), 1.0);
        assert_eq!(organization(&owned_by("google-research", "google-research/bert")), 1.0);
        assert_eq!(organization(&owned_by("microsoft_ai", "microsoft_ai/phi")), 1.0);
        assert_eq!(organization(&owned_by("ai", "ai/tiny")), 1.0);
        assert_eq!(organization(&owned_by("someone", "someone/research-notes")), 1.0);
    }

    #[test]
    fn test_personal_names_are_not_organizations() {
        assert_eq!(organization(&owned_by("mitchell", "mitchell/model")), 0.5);
        assert_eq!(organization(&owned_by("metamorph", "metamorph/model")), 0.5);
        assert_eq!(organization(&owned_by("applegate", "applegate/model")), 0.5);
    }

    #[test]
    fn test_organization_indicator() {
        assert_eq!(organization(&owned_by("visionlab", "visionlab/detector")), 0.8);
        assert_eq!(organization(&owned_by("acme-corp", "acme-corp/model")), 0.8);
    }

    #[test]
    fn test_contributor_buckets() {
        assert_eq!(contributors(None), 0.3);
        assert_eq!(contributors(Some(1)), 0.4);
        assert_eq!(contributors(Some(6)), 0.8);
        assert_eq!(contributors(Some(10)), 1.0);
    }
}
