use async_trait::async_trait;
use trust_registry_core::{ArtifactMetadata, MetricKind, MetricScore};

use super::{Metric, MetricContext};
use crate::error::ServiceResult;

/// Licenses compatible with LGPL-2.1 redistribution
const COMPATIBLE: &[&str] = &[
    "lgpl-2.1",
    "lgpl",
    "mit",
    "bsd",
    "apache-2.0",
    "apache license 2.0",
    "apache",
    "cc0-1.0",
];

/// Platform fields consulted after `license`, in order
const PLATFORM_LICENSE_FIELDS: &[&str] = &["license_name", "license_type"];

const PROBLEMATIC: &[&str] = &["gpl", "gpl-3.0", "agpl", "cc-by-nc", "proprietary"];

/// Classification of a license token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseVerdict {
    Compatible,
    Problematic,
    Unknown,
}

impl LicenseVerdict {
    pub fn classify(token: &str) -> Self {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            LicenseVerdict::Unknown
        } else if COMPATIBLE.iter().any(|l| token.contains(l)) {
            LicenseVerdict::Compatible
        } else if PROBLEMATIC.iter().any(|l| token.contains(l)) {
            LicenseVerdict::Problematic
        } else {
            LicenseVerdict::Unknown
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            LicenseVerdict::Compatible => 1.0,
            LicenseVerdict::Problematic => 0.4,
            LicenseVerdict::Unknown => 0.0,
        }
    }
}

/// License compatibility
#[derive(Debug, Clone, Copy, Default)]
pub struct LicenseMetric;

impl LicenseMetric {
    /// First license token found in the license field, the platform's
    /// `license_name`/`license_type` fields, the tags, or a `license:` README line
    pub fn extract(metadata: &ArtifactMetadata) -> Option<String> {
        let platform_fields = PLATFORM_LICENSE_FIELDS
            .iter()
            .filter_map(|key| metadata.extra_field(key).and_then(|v| v.as_str()));
        if let Some(license) = metadata
            .license
            .as_deref()
            .into_iter()
            .chain(platform_fields)
            .map(str::trim)
            .find(|l| !l.is_empty())
        {
            return Some(license.to_lowercase());
        }

        let from_line = |line: &str| {
            let lowered = line.to_lowercase();
            lowered
                .find("license:")
                .map(|at| lowered[at + "license:".len()..].trim().to_string())
                .filter(|v| !v.is_empty())
        };

        metadata
            .tags
            .iter()
            .find_map(|tag| from_line(tag))
            .or_else(|| metadata.readme_text().lines().find_map(from_line))
    }

    pub fn score(metadata: &ArtifactMetadata) -> f64 {
        Self::extract(metadata)
            .map(|token| LicenseVerdict::classify(&token).score())
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl Metric for LicenseMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::License
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        Ok(MetricScore::scalar(Self::score(ctx.metadata())))
    }
}
