//! Artifact records and their normalized metadata
//!
//! [`ArtifactMetadata`] is produced once per ingestion by whichever platform
//! fetcher resolved the artifact. Fields the scoring and resolution logic
//! read are modelled explicitly; anything else the source platform returned
//! is kept verbatim in [`ArtifactMetadata::extra`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dependency::DependencyExpectation;
use crate::error::{RegistryError, Result};
use crate::lineage::LineageHint;
use crate::score::ScoreRecord;
use crate::types::{ArtifactId, ArtifactKind, Tags};

/// One entry of an artifact's file listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the repository root
    pub name: String,

    /// Size in bytes, when the platform reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Code-review statistics for a linked code repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    /// Changes that landed through a reviewed pull request
    pub reviewed_changes: u64,
    /// All changes considered
    pub total_changes: u64,
}

/// Normalized metadata describing one artifact
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Platform identifier, e.g. `google-bert/bert-base-uncased`
    pub identifier: String,

    /// Display name
    pub name: String,

    /// Source ecosystem, e.g. `huggingface` or `github`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// URL the artifact was ingested from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,

    /// Datasets declared by the model card
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,

    /// Total repository storage in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_storage: Option<u64>,

    /// Total size of safetensors weight files in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safetensors_total: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors_count: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,

    /// Raw configuration blob (e.g. `config.json`), may carry lineage hints
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,

    /// Dependencies declared by a model, extracted once at ingestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_dependencies: Option<DependencyExpectation>,

    /// Parent models extracted from the configuration or card
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_lineage: Vec<LineageHint>,

    /// Linked code repository URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_repository: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_stats: Option<ReviewStats>,

    /// Platform fields not modelled above
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ArtifactMetadata {
    /// Create metadata with the required fields
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a builder for constructing artifact metadata
    pub fn builder(identifier: impl Into<String>, name: impl Into<String>) -> ArtifactMetadataBuilder {
        ArtifactMetadataBuilder::new(identifier, name)
    }

    /// Validate the metadata
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::ValidationError(
                "Artifact name cannot be empty".to_string(),
            ));
        }

        if let Some(ref url) = self.source_url {
            url::Url::parse(url).map_err(|e| {
                RegistryError::ValidationError(format!("Invalid source URL {}: {}", url, e))
            })?;
        }

        if let Some(stats) = self.review_stats {
            if stats.reviewed_changes > stats.total_changes {
                return Err(RegistryError::ValidationError(format!(
                    "reviewed_changes ({}) exceeds total_changes ({})",
                    stats.reviewed_changes, stats.total_changes
                )));
            }
        }

        Ok(())
    }

    /// README text, empty when absent
    pub fn readme_text(&self) -> &str {
        self.readme.as_deref().unwrap_or_default()
    }

    /// Description text, empty when absent
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Check if metadata has a specific tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Get a raw platform field
    pub fn extra_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }
}

/// Builder for ArtifactMetadata
pub struct ArtifactMetadataBuilder {
    metadata: ArtifactMetadata,
}

impl ArtifactMetadataBuilder {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ArtifactMetadata::new(identifier, name),
        }
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.metadata.platform = Some(platform.into());
        self
    }

    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.metadata.source_url = Some(url.into());
        self
    }

    pub fn readme(mut self, readme: impl Into<String>) -> Self {
        self.metadata.readme = Some(readme.into());
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.metadata.description = Some(desc.into());
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.metadata.license = Some(license.into());
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    /// Add multiple tags
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.metadata.tags.extend(tags);
        self
    }

    /// Declare a dataset on the model card
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.metadata.datasets.push(dataset.into());
        self
    }

    /// Add a file to the listing
    pub fn file(mut self, name: impl Into<String>, size: Option<u64>) -> Self {
        self.metadata.files.push(FileEntry::new(name, size));
        self
    }

    pub fn used_storage(mut self, bytes: u64) -> Self {
        self.metadata.used_storage = Some(bytes);
        self
    }

    pub fn safetensors_total(mut self, bytes: u64) -> Self {
        self.metadata.safetensors_total = Some(bytes);
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.metadata.author = Some(author.into());
        self
    }

    pub fn contributors_count(mut self, count: u32) -> Self {
        self.metadata.contributors_count = Some(count);
        self
    }

    pub fn last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.last_modified = Some(at);
        self
    }

    pub fn downloads(mut self, downloads: u64) -> Self {
        self.metadata.downloads = Some(downloads);
        self
    }

    pub fn likes(mut self, likes: u64) -> Self {
        self.metadata.likes = Some(likes);
        self
    }

    pub fn config(mut self, config: serde_json::Value) -> Self {
        self.metadata.config = config;
        self
    }

    pub fn expected_dependencies(mut self, expectation: DependencyExpectation) -> Self {
        self.metadata.expected_dependencies = Some(expectation);
        self
    }

    pub fn lineage_hint(mut self, hint: LineageHint) -> Self {
        self.metadata.auto_lineage.push(hint);
        self
    }

    pub fn code_repository(mut self, url: impl Into<String>) -> Self {
        self.metadata.code_repository = Some(url.into());
        self
    }

    pub fn review_stats(mut self, reviewed_changes: u64, total_changes: u64) -> Self {
        self.metadata.review_stats = Some(ReviewStats {
            reviewed_changes,
            total_changes,
        });
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }

    /// Build the metadata with validation
    pub fn build(self) -> Result<ArtifactMetadata> {
        self.metadata.validate()?;
        Ok(self.metadata)
    }

    /// Build without validation
    pub fn build_unchecked(self) -> ArtifactMetadata {
        self.metadata
    }
}

/// A persisted artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub metadata: ArtifactMetadata,

    /// Score state, present for scored models only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreRecord>,

    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(id: ArtifactId, kind: ArtifactKind, metadata: ArtifactMetadata) -> Self {
        Self {
            id,
            kind,
            metadata,
            score: None,
            created_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn source_url(&self) -> Option<&str> {
        self.metadata.source_url.as_deref()
    }

    pub fn is_model(&self) -> bool {
        self.kind == ArtifactKind::Model
    }

    /// Declared expectations, empty when none were extracted
    pub fn expectations(&self) -> DependencyExpectation {
        self.metadata.expected_dependencies.clone().unwrap_or_default()
    }

    /// Ensure this artifact has the expected kind
    pub fn require_kind(&self, kind: ArtifactKind) -> Result<()> {
        if self.kind != kind {
            return Err(RegistryError::InvalidArtifactKind(format!(
                "artifact {} is a {}, expected a {}",
                self.id, self.kind, kind
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.metadata.name, self.id)
    }
}
