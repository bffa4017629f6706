use async_trait::async_trait;
use std::collections::HashSet;
use trust_registry_core::score::clamp_unit;
use trust_registry_core::{ArtifactMetadata, MetricKind, MetricScore};

use super::{contains_any, Metric, MetricContext};
use crate::error::ServiceResult;

const PERFORMANCE_TERMS: &[&str] = &[
    "accuracy",
    "benchmark",
    "evaluation",
    "metric",
    "performance",
    "score",
    "result",
];

const KNOWN_BENCHMARKS: &[&str] = &[
    "glue", "superglue", "squad", "mmlu", "imagenet", "hellaswag", "humaneval", "gsm8k", "coco",
    "wmt", "librispeech", "cifar", "truthfulqa", "winogrande", "bigbench",
];

/// Evidence behind the README's performance claims
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceClaimsMetric;

impl PerformanceClaimsMetric {
    pub fn score(metadata: &ArtifactMetadata) -> f64 {
        let readme = metadata.readme_text();
        let lowered = readme.to_lowercase();
        if !contains_any(&lowered, PERFORMANCE_TERMS) {
            return 0.0;
        }

        let mut score = 0.3;
        if has_numeric_result(readme) {
            score += 0.25;
        }
        if has_results_table(readme) {
            score += 0.25;
        }
        if names_benchmark(&lowered) {
            score += 0.20;
        }
        clamp_unit(score)
    }
}

/// A percentage or a decimal figure such as `91.3%` or `0.87`
fn has_numeric_result(text: &str) -> bool {
    text.split(|c: char| c.is_whitespace() || c == '|' || c == '(' || c == ')')
        .map(|token| token.trim_end_matches(|c: char| matches!(c, ',' | ';' | ':')))
        .any(|token| {
            if let Some(number) = token.strip_suffix('%') {
                return number.parse::<f64>().is_ok();
            }
            let token = token.trim_end_matches('.');
            token.contains('.') && token.parse::<f64>().is_ok()
        })
}

/// A markdown table: a pipe row followed by a `|---|` separator
fn has_results_table(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    lines.windows(2).any(|pair| {
        pair[0].starts_with('|')
            && pair[1].starts_with('|')
            && pair[1].contains("---")
            && pair[1].chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
    })
}

fn names_benchmark(lowered: &str) -> bool {
    let words: HashSet<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    KNOWN_BENCHMARKS.iter().any(|b| words.contains(b))
}

#[async_trait]
impl Metric for PerformanceClaimsMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::PerformanceClaims
    }

    async fn compute(&self, ctx: &MetricContext) -> ServiceResult<MetricScore> {
        Ok(MetricScore::scalar(Self::score(ctx.metadata())))
    }
}
