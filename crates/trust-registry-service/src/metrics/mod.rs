//! Scoring metrics
//!
//! Every metric implements [`Metric`]: it reads one artifact (and, for the
//! presence metrics, the persisted dependency table) and produces a
//! [`MetricScore`]. Metrics never see each other's results. A metric that
//! errors is scored zero by the aggregator, so implementations return
//! `Err` only for genuine failures and degrade to a defined default when
//! metadata fields are missing.

mod availability;
mod bus_factor;
mod license;
mod performance;
mod presence;
mod ramp_up;
mod reviewedness;
mod size;
mod tree;

pub use availability::DatasetAndCodeMetric;
pub use bus_factor::BusFactorMetric;
pub use license::{LicenseMetric, LicenseVerdict};
pub use performance::PerformanceClaimsMetric;
pub use presence::DependencyPresenceMetric;
pub use ramp_up::RampUpMetric;
pub use reviewedness::ReviewednessMetric;
pub use size::{SizeMetric, DEFAULT_MODEL_SIZE_GB};
pub use tree::TreeScoreMetric;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use trust_registry_core::{Artifact, ArtifactMetadata, MetricKind, MetricScore};
use trust_registry_db::ArtifactRepository;

use crate::error::ServiceResult;

/// Everything a metric may read
#[derive(Clone)]
pub struct MetricContext {
    pub artifact: Artifact,
    pub repository: Arc<dyn ArtifactRepository>,
}

impl MetricContext {
    pub fn new(artifact: Artifact, repository: Arc<dyn ArtifactRepository>) -> Self {
        Self {
            artifact,
            repository,
        }
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.artifact.metadata
    }
}

impl fmt::Debug for MetricContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricContext")
            .field("artifact", &self.artifact.id)
            .finish_non_exhaustive()
    }
}

/// A single scoring criterion
#[async_trait]
pub trait Metric: Send + Sync {
    /// Which metric this is; determines its weight
    fn kind(&self) -> MetricKind;

    /// Score one artifact
    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore>;
}

/// The metrics an aggregator runs, at most one per kind
#[derive(Clone)]
pub struct MetricSet {
    metrics: BTreeMap<MetricKind, Arc<dyn Metric>>,
}

impl MetricSet {
    /// An empty set
    pub fn empty() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    /// Every built-in metric
    pub fn standard() -> Self {
        Self::empty()
            .with(RampUpMetric)
            .with(LicenseMetric)
            .with(DatasetAndCodeMetric)
            .with(PerformanceClaimsMetric)
            .with(BusFactorMetric::new())
            .with(DependencyPresenceMetric::code_quality())
            .with(DependencyPresenceMetric::dataset_quality())
            .with(SizeMetric)
            .with(TreeScoreMetric)
            .with(ReviewednessMetric)
    }

    /// Add a metric, replacing any existing one of the same kind
    pub fn with(mut self, metric: impl Metric + 'static) -> Self {
        self.insert(Arc::new(metric));
        self
    }

    pub fn insert(&mut self, metric: Arc<dyn Metric>) {
        self.metrics.insert(metric.kind(), metric);
    }

    pub fn get(&self, kind: MetricKind) -> Option<Arc<dyn Metric>> {
        self.metrics.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<MetricKind> {
        self.metrics.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Metric>> {
        self.metrics.values()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.metrics.keys()).finish()
    }
}

/// Case-insensitive check for any of `terms` in already-lowercased text
pub(crate) fn contains_any(lowered: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| lowered.contains(t))
}
