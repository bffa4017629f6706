//! Service layer for the trust registry
//!
//! This crate sits on top of the persistence layer and implements scoring,
//! dependency resolution and lineage construction.
//!
//! # Architecture
//!
//! - **ScoreAggregator**: Runs every metric concurrently under a per-metric
//!   deadline and combines the results into a weighted net score
//! - **DependencyResolver**: Links newly ingested datasets and code to the
//!   models that expect them, then refreshes the affected presence metrics
//! - **LineageGraphBuilder**: Walks model-to-model relationships from a root
//! - **IngestionService**: Stores artifacts and triggers the above
//!
//! # Example
//!
//! ```rust,no_run
//! use trust_registry_core::{ArtifactKind, ArtifactMetadata};
//! use trust_registry_db::InMemoryArtifactRepository;
//! use trust_registry_service::ServiceRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let services = ServiceRegistry::new(Arc::new(InMemoryArtifactRepository::new()))?;
//!
//! let metadata = ArtifactMetadata::builder("org/model", "model")
//!     .license("MIT")
//!     .readme("Fine-tuned on SQuAD.")
//!     .build()?;
//! let report = services.ingestion().ingest(ArtifactKind::Model, metadata).await?;
//! let graph = services.lineage().build_lineage(report.artifact.id).await?;
//! println!("{} nodes", graph.node_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extraction;
pub mod ingestion;
pub mod lineage;
pub mod metrics;
pub mod resolver;
pub mod scoring;
pub mod telemetry;

// Re-export main types for convenience
pub use config::{DatabaseConfig, LoggingConfig, ResolverConfig, ScoringConfig, ServiceConfig};
pub use error::{ServiceError, ServiceResult};
pub use extraction::{extract_or_empty, parent_references, HintExtractor, ParentReference, RuleBasedExtractor};
pub use metrics::{Metric, MetricContext, MetricSet};

// Re-export service traits and implementations
pub use ingestion::{DefaultIngestionService, IngestionReport, IngestionService};
pub use lineage::{DefaultLineageGraphBuilder, LineageGraphBuilder};
pub use resolver::{DefaultDependencyResolver, DependencyResolver, ResolutionOutcome, ResolutionRequest};
pub use scoring::{DefaultScoreAggregator, ScoreAggregator, DEFAULT_METRIC_TIMEOUT};

use std::sync::Arc;
use tracing::info;
use trust_registry_db::{create_pool, ArtifactRepository, PostgresArtifactRepository};

/// Service registry that holds all service instances
///
/// Every service shares one repository, one aggregator and one extractor.
#[derive(Clone)]
pub struct ServiceRegistry {
    /// Persistence backing every service
    pub repository: Arc<dyn ArtifactRepository>,
    /// Score aggregation
    pub aggregator: Arc<dyn ScoreAggregator>,
    /// Dependency resolution
    pub resolver: Arc<dyn DependencyResolver>,
    /// Lineage construction
    pub lineage: Arc<dyn LineageGraphBuilder>,
    /// Artifact ingestion
    pub ingestion: Arc<dyn IngestionService>,
}

impl ServiceRegistry {
    /// Create a service registry with default implementations and settings
    pub fn new(repository: Arc<dyn ArtifactRepository>) -> ServiceResult<Self> {
        ServiceRegistryBuilder::new().repository(repository).build()
    }

    /// Create a service registry honouring the scoring and resolver settings
    pub fn from_config(
        repository: Arc<dyn ArtifactRepository>,
        config: &ServiceConfig,
    ) -> ServiceResult<Self> {
        ServiceRegistryBuilder::new()
            .repository(repository)
            .config(config.clone())
            .build()
    }

    /// Connect to PostgreSQL and build the registry on top of it
    pub async fn connect(config: &ServiceConfig) -> ServiceResult<Self> {
        config.validate()?;
        let pool = create_pool(&config.database.pool_config()).await?;
        info!("Connected to artifact store");
        Self::from_config(Arc::new(PostgresArtifactRepository::new(pool)), config)
    }

    /// Get the repository
    pub fn repository(&self) -> &Arc<dyn ArtifactRepository> {
        &self.repository
    }

    /// Get the score aggregator
    pub fn aggregator(&self) -> &Arc<dyn ScoreAggregator> {
        &self.aggregator
    }

    /// Get the dependency resolver
    pub fn resolver(&self) -> &Arc<dyn DependencyResolver> {
        &self.resolver
    }

    /// Get the lineage builder
    pub fn lineage(&self) -> &Arc<dyn LineageGraphBuilder> {
        &self.lineage
    }

    /// Get the ingestion service
    pub fn ingestion(&self) -> &Arc<dyn IngestionService> {
        &self.ingestion
    }
}

/// Builder for ServiceRegistry with custom configuration
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    repository: Option<Arc<dyn ArtifactRepository>>,
    config: ServiceConfig,
    metrics: Option<MetricSet>,
    extractor: Option<Arc<dyn HintExtractor>>,
    aggregator: Option<Arc<dyn ScoreAggregator>>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    lineage: Option<Arc<dyn LineageGraphBuilder>>,
    ingestion: Option<Arc<dyn IngestionService>>,
}

impl ServiceRegistryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repository
    pub fn repository(mut self, repository: Arc<dyn ArtifactRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Use scoring and resolver settings from configuration
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the metric set used by the default aggregator
    pub fn metrics(mut self, metrics: MetricSet) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set a custom text-extraction collaborator
    pub fn extractor(mut self, extractor: Arc<dyn HintExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set a custom score aggregator
    pub fn aggregator(mut self, aggregator: Arc<dyn ScoreAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Set a custom dependency resolver
    pub fn resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set a custom lineage builder
    pub fn lineage(mut self, lineage: Arc<dyn LineageGraphBuilder>) -> Self {
        self.lineage = Some(lineage);
        self
    }

    /// Set a custom ingestion service
    pub fn ingestion(mut self, ingestion: Arc<dyn IngestionService>) -> Self {
        self.ingestion = Some(ingestion);
        self
    }

    /// Build the service registry
    ///
    /// Default implementations are created for any service not explicitly set.
    ///
    /// # Errors
    ///
    /// Returns an error if no repository was set, the configuration is
    /// invalid or the default extractor cannot be built.
    pub fn build(self) -> ServiceResult<ServiceRegistry> {
        let repository = self
            .repository
            .ok_or_else(|| ServiceError::Configuration("Repository is required".to_string()))?;
        self.config.validate()?;

        let extractor: Arc<dyn HintExtractor> = match self.extractor {
            Some(extractor) => extractor,
            None => Arc::new(RuleBasedExtractor::new()?),
        };

        let aggregator: Arc<dyn ScoreAggregator> = match self.aggregator {
            Some(aggregator) => aggregator,
            None => {
                let mut aggregator =
                    DefaultScoreAggregator::from_config(repository.clone(), &self.config.scoring);
                if let Some(metrics) = self.metrics {
                    aggregator = aggregator.with_metrics(metrics);
                }
                Arc::new(aggregator)
            }
        };

        let threshold = self.config.resolver.match_threshold;
        let resolver = self.resolver.unwrap_or_else(|| {
            Arc::new(
                DefaultDependencyResolver::new(
                    repository.clone(),
                    aggregator.clone(),
                    extractor.clone(),
                )
                .with_threshold(threshold),
            )
        });

        let lineage = self
            .lineage
            .unwrap_or_else(|| Arc::new(DefaultLineageGraphBuilder::new(repository.clone())));

        let ingestion = self.ingestion.unwrap_or_else(|| {
            Arc::new(DefaultIngestionService::new(
                repository.clone(),
                aggregator.clone(),
                resolver.clone(),
                extractor.clone(),
            ))
        });

        Ok(ServiceRegistry {
            repository,
            aggregator,
            resolver,
            lineage,
            ingestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::MockHintExtractor;
    use trust_registry_core::{ArtifactKind, ArtifactMetadata, MetricKind};
    use trust_registry_db::InMemoryArtifactRepository;

    #[test]
    fn test_builder_requires_repository() {
        let result = ServiceRegistryBuilder::new().build();
        assert!(matches!(result, Err(ServiceError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = ServiceConfig::default();
        config.resolver.match_threshold = 0.0;
        let result = ServiceRegistry::from_config(Arc::new(InMemoryArtifactRepository::new()), &config);
        assert!(matches!(result, Err(ServiceError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_custom_extractor_and_metrics_are_used() {
        let mut extractor = MockHintExtractor::new();
        extractor
            .expect_extract()
            .times(1)
            .returning(|_| Err(ServiceError::Extraction("offline".into())));

        let services = ServiceRegistryBuilder::new()
            .repository(Arc::new(InMemoryArtifactRepository::new()))
            .extractor(Arc::new(extractor))
            .metrics(MetricSet::empty().with(metrics::LicenseMetric))
            .build()
            .unwrap();

        let metadata = ArtifactMetadata::builder("org/m", "m")
            .license("apache-2.0")
            .readme("Trained on C4.")
            .build()
            .unwrap();
        let report = services
            .ingestion()
            .ingest(ArtifactKind::Model, metadata)
            .await
            .unwrap();

        let score = report.score().unwrap();
        assert_eq!(score.metrics.len(), 1);
        assert_eq!(score.value_of(MetricKind::License), Some(1.0));
        assert!(report.artifact.expectations().is_empty());
    }
}
