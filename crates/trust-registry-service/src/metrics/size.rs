use async_trait::async_trait;
use std::collections::BTreeMap;
use trust_registry_core::{ArtifactMetadata, HardwareClass, MetricKind, MetricScore};

use super::{Metric, MetricContext};
use crate::error::ServiceResult;

/// Assumed size when no signal is available
pub const DEFAULT_MODEL_SIZE_GB: f64 = 0.6;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

const WEIGHT_FILE_MARKERS: &[&str] = &[
    ".safetensors",
    "pytorch_model.bin",
    "tf_model.h5",
    "model.onnx",
    ".gguf",
    "checkpoint",
];

/// Fit of the model on each hardware class
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeMetric;

impl SizeMetric {
    /// Model size in GiB from the best available signal
    pub fn model_size_gb(metadata: &ArtifactMetadata) -> f64 {
        let weight_files: u64 = metadata
            .files
            .iter()
            .filter(|f| {
                let name = f.name.to_lowercase();
                WEIGHT_FILE_MARKERS.iter().any(|m| name.contains(m))
            })
            .filter_map(|f| f.size)
            .sum();

        [
            metadata.used_storage,
            metadata.safetensors_total,
            Some(weight_files),
        ]
        .into_iter()
        .flatten()
        .find(|bytes| *bytes > 0)
        .map(|bytes| bytes as f64 / BYTES_PER_GB)
        .unwrap_or(DEFAULT_MODEL_SIZE_GB)
    }

    pub fn score(metadata: &ArtifactMetadata) -> BTreeMap<HardwareClass, f64> {
        let size = Self::model_size_gb(metadata);
        HardwareClass::ALL
            .iter()
            .map(|class| (*class, (class.memory_ceiling_gb() / size).min(1.0)))
            .collect()
    }
}

#[async_trait]
impl Metric for SizeMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::SizeScore
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        Ok(MetricScore::per_platform(Self::score(ctx.metadata())))
    }
}
