//! Service-layer error types
//!
//! This module defines error types specific to the service layer,
//! mapping domain and database errors to service-level errors.

use thiserror::Error;
use trust_registry_core::RegistryError;
use trust_registry_db::DbError;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Artifact not found
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Artifact exists but has the wrong kind for the operation
    #[error("Invalid artifact type: {0}")]
    InvalidType(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Text extraction collaborator failed or returned malformed data
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A single metric failed
    #[error("Metric {metric} failed: {message}")]
    MetricFailure { metric: String, message: String },

    /// Persistence failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal service error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Build a metric failure
    pub fn metric(metric: impl std::fmt::Display, message: impl Into<String>) -> Self {
        ServiceError::MetricFailure {
            metric: metric.to_string(),
            message: message.into(),
        }
    }

    /// HTTP-like status code for an outer request surface
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::InvalidType(_) | ServiceError::ValidationFailed(_) => 400,
            ServiceError::Persistence(_) => 503,
            _ => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ArtifactNotFound(msg) => ServiceError::NotFound(msg),
            RegistryError::InvalidArtifactKind(msg) => ServiceError::InvalidType(msg),
            RegistryError::InvalidIdentifier(msg) => ServiceError::ValidationFailed(msg),
            RegistryError::ValidationError(msg) => ServiceError::ValidationFailed(msg),
            RegistryError::SerializationError(msg) => ServiceError::Internal(msg),
            RegistryError::InternalError(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => ServiceError::NotFound(msg),
            DbError::ConstraintViolation(msg)
            | DbError::ForeignKeyViolation(msg)
            | DbError::InvalidData(msg) => ServiceError::ValidationFailed(msg),
            DbError::Connection(msg) | DbError::Query(msg) => ServiceError::Persistence(msg),
            DbError::Configuration(msg) => ServiceError::Configuration(msg),
            DbError::Serialization(msg) | DbError::Migration(msg) | DbError::Internal(msg) => {
                ServiceError::Internal(msg)
            }
            DbError::Domain(err) => ServiceError::from(err),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("Serialization error: {}", err))
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Configuration(err.to_string())
    }
}
