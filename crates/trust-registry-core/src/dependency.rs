//! Model dependency expectations and discovered dependency edges
//!
//! A model declares, through its README and configuration, which datasets
//! and code repositories it expects to depend on. When a matching dataset or
//! code artifact is ingested a [`DependencyEdge`] is recorded. Each model may
//! hold at most one edge per [`DependencyType`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{ArtifactId, ArtifactKind};

/// A dataset a model expects to have been trained or evaluated on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedDataset {
    /// Dataset name as written in the model card
    pub name: String,

    /// Alternative spellings or short names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl ExpectedDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
        }
    }

    /// Add a keyword
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// Name followed by every keyword
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.keywords.iter().map(String::as_str))
    }
}

/// A code repository a model expects to be built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCode {
    /// Repository URL, usually on a hosted-code platform
    pub url: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl ExpectedCode {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            keywords: Vec::new(),
        }
    }

    /// Add a keyword
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// URL followed by every keyword
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.keywords.iter().map(String::as_str))
    }
}

/// Dependencies a model declares, extracted once at ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyExpectation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub training_datasets: Vec<ExpectedDataset>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eval_datasets: Vec<ExpectedDataset>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_repositories: Vec<ExpectedCode>,
}

impl DependencyExpectation {
    /// Check whether any dataset (training or evaluation) is expected
    pub fn expects_datasets(&self) -> bool {
        !self.training_datasets.is_empty() || !self.eval_datasets.is_empty()
    }

    /// Check whether any code repository is expected
    pub fn expects_code(&self) -> bool {
        !self.code_repositories.is_empty()
    }

    /// Check whether nothing at all is expected
    pub fn is_empty(&self) -> bool {
        !self.expects_datasets() && !self.expects_code()
    }

    /// Every expected dataset name and keyword, training sets first
    pub fn dataset_identifiers(&self) -> impl Iterator<Item = &str> {
        self.training_datasets
            .iter()
            .chain(self.eval_datasets.iter())
            .flat_map(ExpectedDataset::identifiers)
    }

    /// Every expected code URL and keyword
    pub fn code_identifiers(&self) -> impl Iterator<Item = &str> {
        self.code_repositories
            .iter()
            .flat_map(ExpectedCode::identifiers)
    }
}

/// Type of a model dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Dataset,
    Code,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Dataset => "dataset",
            DependencyType::Code => "code",
        }
    }

    /// Dependency type implied by an artifact kind; models are never dependencies
    pub fn for_kind(kind: ArtifactKind) -> Option<Self> {
        match kind {
            ArtifactKind::Dataset => Some(DependencyType::Dataset),
            ArtifactKind::Code => Some(DependencyType::Code),
            ArtifactKind::Model => None,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset" => Ok(Self::Dataset),
            "code" => Ok(Self::Code),
            _ => Err(format!("Invalid dependency type: {}", s)),
        }
    }
}

/// How an edge came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSource {
    /// Matched against the model's declared expectations
    AutoDiscovered,
    /// Propagated from a dataset mentioned by a linked code artifact
    CascadedFromCode,
    /// Declared explicitly by a user
    UserProvided,
}

impl EdgeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeSource::AutoDiscovered => "auto_discovered",
            EdgeSource::CascadedFromCode => "cascaded_from_code",
            EdgeSource::UserProvided => "user_provided",
        }
    }
}

impl fmt::Display for EdgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EdgeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_discovered" => Ok(Self::AutoDiscovered),
            "cascaded_from_code" => Ok(Self::CascadedFromCode),
            "user_provided" => Ok(Self::UserProvided),
            _ => Err(format!("Invalid edge source: {}", s)),
        }
    }
}

/// A persisted link from a model to a dataset or code artifact.
///
/// Uniqueness is on `(model_id, artifact_id, dependency_type)`, and a model
/// holds at most one edge of each type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub model_id: ArtifactId,
    pub artifact_id: ArtifactId,
    pub dependency_type: DependencyType,
    pub source: EdgeSource,
}

impl DependencyEdge {
    pub fn new(
        model_id: ArtifactId,
        artifact_id: ArtifactId,
        dependency_type: DependencyType,
        source: EdgeSource,
    ) -> Self {
        Self {
            model_id,
            artifact_id,
            dependency_type,
            source,
        }
    }

    /// Check whether two edges collide on the uniqueness key
    pub fn same_key(&self, other: &DependencyEdge) -> bool {
        self.model_id == other.model_id
            && self.artifact_id == other.artifact_id
            && self.dependency_type == other.dependency_type
    }
}
