//! Service configuration
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. `config/default.toml`
//! 2. `config/{environment}.toml`
//! 3. Environment variables prefixed with `TRUST_REGISTRY`, nested with `__`
//!    (e.g. `TRUST_REGISTRY__SCORING__METRIC_TIMEOUT_SECS=10`)

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use trust_registry_db::{pool, PoolConfig};

use crate::error::{ServiceError, ServiceResult};
use crate::telemetry::TelemetryConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TRUST_REGISTRY";

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_database_url() -> String {
    "postgres://localhost/trust_registry".to_string()
}

fn default_max_connections() -> u32 {
    pool::DEFAULT_MAX_CONNECTIONS
}

fn default_min_connections() -> u32 {
    pool::DEFAULT_MIN_CONNECTIONS
}

fn default_connect_timeout() -> u64 {
    pool::DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            run_migrations: default_true(),
        }
    }
}

impl DatabaseConfig {
    /// Pool settings for the persistence layer
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(&self.url)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .run_migrations(self.run_migrations)
    }
}

/// Score aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Per-metric deadline
    #[serde(default = "default_metric_timeout")]
    pub metric_timeout_secs: u64,

    /// Upper bound on concurrently running metrics; unset means
    /// `min(metric count, available parallelism)`
    #[serde(default)]
    pub max_workers: Option<usize>,
}

fn default_metric_timeout() -> u64 {
    30
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            metric_timeout_secs: default_metric_timeout(),
            max_workers: None,
        }
    }
}

impl ScoringConfig {
    pub fn metric_timeout(&self) -> Duration {
        Duration::from_secs(self.metric_timeout_secs)
    }
}

/// Dependency resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum matcher score for a link
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

fn default_match_threshold() -> f64 {
    trust_registry_core::DEFAULT_MATCH_THRESHOLD
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,

    /// Print the module path of each event
    #[serde(default = "default_true")]
    pub show_target: bool,

    #[serde(default)]
    pub show_thread_ids: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            show_target: true,
            show_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig::new()
            .with_log_level(&self.level)
            .with_json_format(self.json_format)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
    }
}

impl ServiceConfig {
    /// Load configuration from files and environment
    ///
    /// # Arguments
    ///
    /// * `config_dir` - Directory containing configuration files
    /// * `environment` - Environment name (development, production, etc.)
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> ServiceResult<Self> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: ServiceConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load using `CONFIG_DIR` and `ENVIRONMENT`, after reading a `.env` file if present
    pub fn from_env() -> ServiceResult<Self> {
        dotenvy::dotenv().ok();
        Self::load(config_dir(), &environment())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(ServiceError::Configuration(
                "database.url cannot be empty".to_string(),
            ));
        }
        if self.scoring.metric_timeout_secs == 0 {
            return Err(ServiceError::Configuration(
                "scoring.metric_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.scoring.max_workers == Some(0) {
            return Err(ServiceError::Configuration(
                "scoring.max_workers must be greater than 0".to_string(),
            ));
        }
        let threshold = self.resolver.match_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ServiceError::Configuration(format!(
                "resolver.match_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        Ok(())
    }
}

/// Current environment name from `ENVIRONMENT` or `ENV`, default "development"
pub fn environment() -> String {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Configuration directory from `CONFIG_DIR`, default "config"
pub fn config_dir() -> PathBuf {
    std::env::var("CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.scoring.metric_timeout(), Duration::from_secs(30));
        assert_eq!(config.resolver.match_threshold, 0.75);
        assert_eq!(config.logging.level, "info");
        let telemetry = config.logging.telemetry_config();
        assert!(telemetry.include_target);
        assert!(!telemetry.include_thread_ids);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let config = ServiceConfig::load("/nonexistent/trust-registry", "test").unwrap();
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.resolver.match_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.scoring.metric_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.scoring.max_workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_config_conversion() {
        let pool = DatabaseConfig::default().pool_config();
        assert_eq!(pool.max_connections, 10);
        assert_eq!(pool.min_connections, 2);
        assert!(pool.run_migrations);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ServiceConfig = Config::builder()
            .add_source(config::File::from_str(
                "[scoring]\nmetric_timeout_secs = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.scoring.metric_timeout_secs, 5);
        assert_eq!(config.scoring.max_workers, None);
        assert_eq!(config.database.url, default_database_url());
    }
}
