//! Metric identities, weights and the per-model score record

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::HardwareClass;

/// Sentinel written for a metric that has no data to work with
pub const NOT_APPLICABLE_SENTINEL: f64 = -1.0;

/// Every metric the registry knows about.
///
/// The weight table is an exhaustive match, so a new variant without a
/// weight does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    RampUpTime,
    License,
    DatasetAndCodeScore,
    PerformanceClaims,
    BusFactor,
    CodeQuality,
    DatasetQuality,
    SizeScore,
    TreeScore,
    Reviewedness,
}

impl MetricKind {
    pub const ALL: [MetricKind; 10] = [
        MetricKind::RampUpTime,
        MetricKind::License,
        MetricKind::DatasetAndCodeScore,
        MetricKind::PerformanceClaims,
        MetricKind::BusFactor,
        MetricKind::CodeQuality,
        MetricKind::DatasetQuality,
        MetricKind::SizeScore,
        MetricKind::TreeScore,
        MetricKind::Reviewedness,
    ];

    /// Metrics refreshed after a dependency link changes
    pub const DEPENDENCY_PRESENCE: [MetricKind; 2] =
        [MetricKind::DatasetQuality, MetricKind::CodeQuality];

    /// Contribution of this metric to the net score
    pub const fn weight(&self) -> f64 {
        match self {
            MetricKind::RampUpTime => 0.20,
            MetricKind::License => 0.15,
            MetricKind::DatasetAndCodeScore => 0.15,
            MetricKind::PerformanceClaims => 0.15,
            MetricKind::BusFactor => 0.10,
            MetricKind::CodeQuality => 0.10,
            MetricKind::DatasetQuality => 0.10,
            MetricKind::SizeScore => 0.05,
            MetricKind::TreeScore => 0.0,
            MetricKind::Reviewedness => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::RampUpTime => "ramp_up_time",
            MetricKind::License => "license",
            MetricKind::DatasetAndCodeScore => "dataset_and_code_score",
            MetricKind::PerformanceClaims => "performance_claims",
            MetricKind::BusFactor => "bus_factor",
            MetricKind::CodeQuality => "code_quality",
            MetricKind::DatasetQuality => "dataset_quality",
            MetricKind::SizeScore => "size_score",
            MetricKind::TreeScore => "tree_score",
            MetricKind::Reviewedness => "reviewedness",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown metric: {}", s))
    }
}

/// Value produced by one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScore", into = "RawScore")]
pub enum MetricScore {
    /// A scalar in [0,1]
    Scalar(f64),
    /// One scalar in [0,1] per hardware class
    PerPlatform(BTreeMap<HardwareClass, f64>),
    /// The metric needs data this artifact does not have
    NotApplicable,
}

impl MetricScore {
    /// Zero score used for failed or timed-out metrics
    pub fn zero() -> Self {
        MetricScore::Scalar(0.0)
    }

    /// Build a scalar score clamped into [0,1]
    pub fn scalar(value: f64) -> Self {
        MetricScore::Scalar(clamp_unit(value))
    }

    /// Build a per-platform score with every entry clamped into [0,1]
    pub fn per_platform(values: BTreeMap<HardwareClass, f64>) -> Self {
        MetricScore::PerPlatform(values.into_iter().map(|(k, v)| (k, clamp_unit(v))).collect())
    }

    /// Value that enters the weighted sum: the scalar itself, the mean of a
    /// per-platform map, or zero when not applicable.
    pub fn weighted_value(&self) -> f64 {
        match self {
            MetricScore::Scalar(v) => *v,
            MetricScore::PerPlatform(map) if map.is_empty() => 0.0,
            MetricScore::PerPlatform(map) => map.values().sum::<f64>() / map.len() as f64,
            MetricScore::NotApplicable => 0.0,
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, MetricScore::NotApplicable)
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricScore::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawScore {
    Scalar(f64),
    PerPlatform(BTreeMap<HardwareClass, f64>),
}

impl From<RawScore> for MetricScore {
    fn from(raw: RawScore) -> Self {
        match raw {
            RawScore::Scalar(v) if v < 0.0 => MetricScore::NotApplicable,
            RawScore::Scalar(v) => MetricScore::Scalar(v),
            RawScore::PerPlatform(map) => MetricScore::PerPlatform(map),
        }
    }
}

impl From<MetricScore> for RawScore {
    fn from(score: MetricScore) -> Self {
        match score {
            MetricScore::Scalar(v) => RawScore::Scalar(v),
            MetricScore::PerPlatform(map) => RawScore::PerPlatform(map),
            MetricScore::NotApplicable => RawScore::Scalar(NOT_APPLICABLE_SENTINEL),
        }
    }
}

/// One metric's score plus the time it took
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub score: MetricScore,
    pub latency_ms: u64,
}

impl MetricResult {
    pub fn new(score: MetricScore, latency_ms: u64) -> Self {
        Self { score, latency_ms }
    }

    /// Result recorded for a metric that failed, panicked or timed out
    pub fn failed() -> Self {
        Self::new(MetricScore::zero(), 0)
    }
}

/// Persisted per-model scoring state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub metrics: BTreeMap<MetricKind, MetricResult>,
    pub net_score: f64,
    pub net_score_latency_ms: u64,
}

impl ScoreRecord {
    /// Build a record from a set of results and compute its net score
    pub fn from_results(metrics: BTreeMap<MetricKind, MetricResult>, latency_ms: u64) -> Self {
        let net_score = net_score(&metrics);
        Self {
            metrics,
            net_score,
            net_score_latency_ms: latency_ms,
        }
    }

    /// Replace the given results, keep every other cached result verbatim,
    /// and recompute the net score over the merged set.
    pub fn merge(&mut self, updates: BTreeMap<MetricKind, MetricResult>, latency_ms: u64) {
        self.metrics.extend(updates);
        self.net_score = net_score(&self.metrics);
        self.net_score_latency_ms = latency_ms;
    }

    pub fn get(&self, kind: MetricKind) -> Option<&MetricResult> {
        self.metrics.get(&kind)
    }

    /// Weighted value of one metric, if recorded
    pub fn value_of(&self, kind: MetricKind) -> Option<f64> {
        self.get(kind).map(|r| r.score.weighted_value())
    }
}

/// `round(sum(weight * score), 3)` over the given results
pub fn net_score(metrics: &BTreeMap<MetricKind, MetricResult>) -> f64 {
    let total: f64 = metrics
        .iter()
        .map(|(kind, result)| kind.weight() * result.score.weighted_value())
        .sum();
    round3(total)
}

/// Round to three decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Clamp into [0,1], mapping NaN to zero
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = MetricKind::ALL.iter().map(|k| k.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_metric_kind_parse() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.as_str().parse::<MetricKind>().unwrap(), kind);
        }
        assert!("reproducibility".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_per_platform_contributes_mean() {
        let mut map = BTreeMap::new();
        map.insert(HardwareClass::RaspberryPi, 0.5);
        map.insert(HardwareClass::AwsServer, 1.0);
        assert_eq!(MetricScore::per_platform(map).weighted_value(), 0.75);
        assert_eq!(MetricScore::NotApplicable.weighted_value(), 0.0);
    }

    #[test]
    fn test_scalar_is_clamped() {
        assert_eq!(MetricScore::scalar(1.7), MetricScore::Scalar(1.0));
        assert_eq!(MetricScore::scalar(-0.2), MetricScore::Scalar(0.0));
        assert_eq!(MetricScore::scalar(f64::NAN), MetricScore::Scalar(0.0));
    }

    #[test]
    fn test_net_score_rounded() {
        let mut metrics = BTreeMap::new();
        metrics.insert(MetricKind::License, MetricResult::new(MetricScore::Scalar(1.0), 1));
        metrics.insert(
            MetricKind::RampUpTime,
            MetricResult::new(MetricScore::Scalar(0.3333), 1),
        );
        let record = ScoreRecord::from_results(metrics, 5);
        // 0.15 + 0.2 * 0.3333 = 0.21666
        assert_eq!(record.net_score, 0.217);
        assert_eq!(record.net_score_latency_ms, 5);
    }

    #[test]
    fn test_merge_preserves_other_metrics() {
        let mut metrics = BTreeMap::new();
        metrics.insert(MetricKind::License, MetricResult::new(MetricScore::Scalar(1.0), 7));
        metrics.insert(MetricKind::DatasetQuality, MetricResult::failed());
        let mut record = ScoreRecord::from_results(metrics, 10);
        assert_eq!(record.net_score, 0.15);

        let mut updates = BTreeMap::new();
        updates.insert(
            MetricKind::DatasetQuality,
            MetricResult::new(MetricScore::Scalar(1.0), 2),
        );
        record.merge(updates, 3);

        assert_eq!(record.get(MetricKind::License).unwrap().latency_ms, 7);
        assert_eq!(record.net_score, 0.25);
        assert_eq!(record.net_score_latency_ms, 3);
    }

    #[test]
    fn test_not_applicable_serializes_as_sentinel() {
        let json = serde_json::to_string(&MetricScore::NotApplicable).unwrap();
        assert_eq!(json, "-1.0");
        let back: MetricScore = serde_json::from_str("-1").unwrap();
        assert!(back.is_not_applicable());
    }

    #[test]
    fn test_score_record_json_shape() {
        let mut map = BTreeMap::new();
        map.insert(HardwareClass::DesktopPc, 1.0);
        let mut metrics = BTreeMap::new();
        metrics.insert(
            MetricKind::SizeScore,
            MetricResult::new(MetricScore::PerPlatform(map), 4),
        );
        let record = ScoreRecord::from_results(metrics, 4);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value["metrics"]["size_score"]["score"]["desktop_pc"],
            serde_json::json!(1.0)
        );
        let back: ScoreRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
