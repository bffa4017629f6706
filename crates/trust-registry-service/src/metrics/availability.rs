use async_trait::async_trait;
use trust_registry_core::score::clamp_unit;
use trust_registry_core::{ArtifactMetadata, MetricKind, MetricScore};

use super::{contains_any, Metric, MetricContext};
use crate::error::ServiceResult;

const DATASET_TERMS: &[&str] = &[
    "dataset",
    "training data",
    "trained on",
    "corpus",
    "data",
    "pretraining",
    "fine-tuned",
    "benchmark",
];

const DATASET_TAG_TERMS: &[&str] = &["dataset", "corpus", "benchmark", "evaluation"];

const CODE_FILE_INDICATORS: &[&str] = &[
    ".py", ".ipynb", ".js", ".ts", ".r", "train", "eval", "inference", "example", "demo",
    "config", ".json", ".yaml", ".yml", ".csv", ".txt", ".jsonl", ".mlmodel",
];

const CODE_TERMS: &[&str] = &[
    "usage",
    "example",
    "code",
    "import",
    "from transformers",
    "model =",
    "tokenizer =",
    "```",
];

const MODEL_FILES: &[&str] = &[
    "config.json",
    "tokenizer",
    "vocab",
    "model.safetensors",
    "pytorch_model.bin",
];

/// Whether datasets and runnable code are documented
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetAndCodeMetric;

impl DatasetAndCodeMetric {
    pub fn score(metadata: &ArtifactMetadata) -> f64 {
        clamp_unit(dataset_documentation(metadata) * 0.35 + code_availability(metadata) * 0.35)
    }
}

fn dataset_documentation(metadata: &ArtifactMetadata) -> f64 {
    let mut score: f64 = 0.0;

    if !metadata.datasets.is_empty() {
        score += 0.25;
    }
    if contains_any(&metadata.readme_text().to_lowercase(), DATASET_TERMS) {
        score += 0.15;
    }
    if metadata
        .tags
        .iter()
        .any(|tag| contains_any(&tag.to_lowercase(), DATASET_TAG_TERMS))
    {
        score += 0.15;
    }
    let description = metadata.description_text().to_lowercase();
    if !description.is_empty() && contains_any(&description, DATASET_TERMS) {
        score += 0.20;
    }

    score.min(1.0)
}

fn code_availability(metadata: &ArtifactMetadata) -> f64 {
    let readme = metadata.readme_text().to_lowercase();
    let files: Vec<String> = metadata.files.iter().map(|f| f.name.to_lowercase()).collect();
    let mut score: f64 = 0.0;

    score += 0.15
        * files
            .iter()
            .filter(|name| contains_any(name, CODE_FILE_INDICATORS))
            .count() as f64;

    if contains_any(&readme, CODE_TERMS) {
        score += 0.25;
    }
    if files.iter().any(|name| contains_any(name, MODEL_FILES)) {
        score += 0.25;
    }

    // Documentation alone earns partial credit
    if files.is_empty()
        && readme.len() > 500
        && contains_any(&readme, &["usage", "how to use", "import"])
    {
        score = 0.3;
    }

    score.min(1.0)
}

#[async_trait]
impl Metric for DatasetAndCodeMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::DatasetAndCodeScore
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        Ok(MetricScore::scalar(Self::score(ctx.metadata())))
    }
}
