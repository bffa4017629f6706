//! Score aggregation
//!
//! Runs a [`MetricSet`] concurrently against one model and folds the results
//! into a [`ScoreRecord`]. Each metric runs in its own task behind a
//! semaphore sized to `min(metric count, available parallelism)` and its own
//! deadline. A metric that errors, panics or times out is recorded as score
//! 0.0 with latency 0; its siblings are unaffected.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, MetricKind, MetricResult, ScoreRecord,
};
use trust_registry_db::ArtifactRepository;

use crate::config::ScoringConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::{Metric, MetricContext, MetricSet};

/// Default per-metric deadline
pub const DEFAULT_METRIC_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for score aggregation
#[async_trait]
pub trait ScoreAggregator: Send + Sync {
    /// Run every metric and build a fresh score record.
    ///
    /// Always returns a complete record; failed metrics are scored 0.0.
    /// The record is not persisted.
    async fn compute_all(&self, artifact: &Artifact) -> ScoreRecord;

    /// Rerun only `metrics` for a stored model, merge them into its stored
    /// record and persist the result
    ///
    /// # Returns
    /// * `Ok(ScoreRecord)` - The merged record
    /// * `Err(ServiceError::NotFound)` - If the model doesn't exist
    /// * `Err(ServiceError::InvalidType)` - If the artifact is not a model
    async fn recompute_subset(
        &self,
        model_id: ArtifactId,
        metrics: &[MetricKind],
    ) -> ServiceResult<ScoreRecord>;
}

/// Default implementation of ScoreAggregator
pub struct DefaultScoreAggregator {
    repository: Arc<dyn ArtifactRepository>,
    metrics: MetricSet,
    metric_timeout: Duration,
    max_workers: Option<usize>,
}

impl DefaultScoreAggregator {
    /// Create an aggregator running the standard metric set
    pub fn new(repository: Arc<dyn ArtifactRepository>) -> Self {
        Self {
            repository,
            metrics: MetricSet::standard(),
            metric_timeout: DEFAULT_METRIC_TIMEOUT,
            max_workers: None,
        }
    }

    pub fn from_config(repository: Arc<dyn ArtifactRepository>, config: &ScoringConfig) -> Self {
        let mut aggregator = Self::new(repository).with_metric_timeout(config.metric_timeout());
        aggregator.max_workers = config.max_workers;
        aggregator
    }

    pub fn with_metrics(mut self, metrics: MetricSet) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_metric_timeout(mut self, timeout: Duration) -> Self {
        self.metric_timeout = timeout;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// Worker pool size for `metric_count` metrics
    pub fn pool_size(&self, metric_count: usize) -> usize {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        metric_count
            .min(parallelism)
            .min(self.max_workers.unwrap_or(usize::MAX))
            .max(1)
    }

    /// Fan out the requested metrics and collect their results
    async fn run(
        &self,
        artifact: &Artifact,
        kinds: &[MetricKind],
    ) -> (BTreeMap<MetricKind, MetricResult>, u64) {
        let started = Instant::now();

        let selected: Vec<Arc<dyn Metric>> = kinds
            .iter()
            .filter_map(|kind| {
                let metric = self.metrics.get(*kind);
                if metric.is_none() {
                    debug!(metric = %kind, "Metric not in set, skipping");
                }
                metric
            })
            .collect();

        let ctx = Arc::new(MetricContext::new(artifact.clone(), self.repository.clone()));
        let semaphore = Arc::new(Semaphore::new(self.pool_size(selected.len())));
        let deadline = self.metric_timeout;

        let mut kinds_in_flight = Vec::with_capacity(selected.len());
        let mut handles = Vec::with_capacity(selected.len());
        for metric in selected {
            let kind = metric.kind();
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);

            kinds_in_flight.push(kind);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ServiceError::Internal(e.to_string()))?;

                let metric_started = Instant::now();
                match tokio::time::timeout(deadline, metric.compute(&ctx)).await {
                    Ok(Ok(score)) => Ok(MetricResult::new(score, elapsed_ms(metric_started))),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ServiceError::metric(
                        kind,
                        format!("timed out after {}s", deadline.as_secs_f64()),
                    )),
                }
            }));
        }

        let mut results = BTreeMap::new();
        for (kind, joined) in kinds_in_flight.into_iter().zip(join_all(handles).await) {
            let result = match joined {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!(metric = %kind, artifact_id = %artifact.id, error = %e, "Metric failed");
                    MetricResult::failed()
                }
                Err(e) => {
                    warn!(metric = %kind, artifact_id = %artifact.id, error = %e, "Metric task aborted");
                    MetricResult::failed()
                }
            };
            results.insert(kind, result);
        }

        (results, elapsed_ms(started))
    }

    async fn load_model(&self, model_id: ArtifactId) -> ServiceResult<Artifact> {
        let artifact = self
            .repository
            .find_by_id(model_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("artifact {}", model_id)))?;
        artifact.require_kind(ArtifactKind::Model)?;
        Ok(artifact)
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl ScoreAggregator for DefaultScoreAggregator {
    #[instrument(skip(self, artifact), fields(artifact_id = %artifact.id))]
    async fn compute_all(&self, artifact: &Artifact) -> ScoreRecord {
        let kinds = self.metrics.kinds();
        let (results, latency) = self.run(artifact, &kinds).await;
        let record = ScoreRecord::from_results(results, latency);

        info!(
            net_score = record.net_score,
            latency_ms = latency,
            "Scored artifact"
        );
        record
    }

    #[instrument(skip(self, metrics), fields(model_id = %model_id))]
    async fn recompute_subset(
        &self,
        model_id: ArtifactId,
        metrics: &[MetricKind],
    ) -> ServiceResult<ScoreRecord> {
        let model = self.load_model(model_id).await?;

        let record = match model.score.clone() {
            Some(mut record) => {
                let (results, latency) = self.run(&model, metrics).await;
                record.merge(results, latency);
                record
            }
            None => {
                debug!("No stored score record, running every metric");
                self.compute_all(&model).await
            }
        };

        self.repository.update_score_record(model_id, &record).await?;
        info!(net_score = record.net_score, "Recomputed score subset");
        Ok(record)
    }
}
