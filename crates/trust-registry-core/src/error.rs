//! Error types for the trust registry domain

use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Main error type for domain operations
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Artifact not found
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Artifact has the wrong kind for the requested operation
    #[error("Invalid artifact kind: {0}")]
    InvalidArtifactKind(String),

    /// Identifier or URL could not be interpreted
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::InvalidIdentifier(err.to_string())
    }
}
