//! Core domain models and types for the trust registry
//!
//! This crate contains the data structures shared by the persistence and
//! service layers: artifacts and their normalized metadata, dependency and
//! lineage edges, metric identities with their weight table, score records,
//! and the fuzzy identifier matcher used to discover dependencies.

pub mod artifact;
pub mod dependency;
pub mod error;
pub mod lineage;
pub mod matcher;
pub mod score;
pub mod types;

// Re-exports for convenience
pub use artifact::{Artifact, ArtifactMetadata, ArtifactMetadataBuilder, FileEntry, ReviewStats};
pub use dependency::{
    DependencyEdge, DependencyExpectation, DependencyType, EdgeSource, ExpectedCode,
    ExpectedDataset,
};
pub use error::{RegistryError, Result};
pub use lineage::{
    LineageEdge, LineageGraph, LineageHint, LineageNode, LineageParent, NodeSource, RelationshipEdge,
    RelationshipType,
};
pub use matcher::{IdentifierMatcher, DEFAULT_MATCH_THRESHOLD};
pub use score::{MetricKind, MetricResult, MetricScore, ScoreRecord};
pub use types::{ArtifactId, ArtifactKind, HardwareClass, Tags};
