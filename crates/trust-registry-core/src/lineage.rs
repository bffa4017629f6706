//! Model-to-model lineage: relationship edges, auto-extracted hints and the
//! node/edge graph returned to callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dependency::EdgeSource;
use crate::types::ArtifactId;

/// Prefix for nodes that name a parent not present in the registry
pub const EXTERNAL_NODE_PREFIX: &str = "external:";

/// Kind of lineage relationship between two models
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RelationshipType {
    BaseModel,
    DerivedFrom,
    FineTunedFrom,
    TeacherModel,
    /// Parameter-efficient adapter, labelled by its method (e.g. `lora`)
    Adapter(String),
}

impl RelationshipType {
    pub fn as_str(&self) -> &str {
        match self {
            RelationshipType::BaseModel => "base_model",
            RelationshipType::DerivedFrom => "derived_from",
            RelationshipType::FineTunedFrom => "fine_tuned_from",
            RelationshipType::TeacherModel => "teacher_model",
            RelationshipType::Adapter(method) => method.as_str(),
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for RelationshipType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "base_model" => RelationshipType::BaseModel,
            "derived_from" => RelationshipType::DerivedFrom,
            "fine_tuned_from" => RelationshipType::FineTunedFrom,
            "teacher_model" => RelationshipType::TeacherModel,
            other => RelationshipType::Adapter(other.to_string()),
        }
    }
}

impl From<String> for RelationshipType {
    fn from(s: String) -> Self {
        RelationshipType::from(s.as_str())
    }
}

impl From<RelationshipType> for String {
    fn from(r: RelationshipType) -> Self {
        r.as_str().to_string()
    }
}

impl FromStr for RelationshipType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RelationshipType::from(s))
    }
}

/// A persisted lineage link, directed from parent to child
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub from_artifact_id: ArtifactId,
    pub to_artifact_id: ArtifactId,
    pub relationship_type: RelationshipType,
    pub source: EdgeSource,
}

impl RelationshipEdge {
    pub fn new(
        from_artifact_id: ArtifactId,
        to_artifact_id: ArtifactId,
        relationship_type: RelationshipType,
        source: EdgeSource,
    ) -> Self {
        Self {
            from_artifact_id,
            to_artifact_id,
            relationship_type,
            source,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from_artifact_id == self.to_artifact_id
    }

    /// The endpoint on the other side of `id`, if `id` is an endpoint at all
    pub fn other_end(&self, id: ArtifactId) -> Option<ArtifactId> {
        if self.from_artifact_id == id {
            Some(self.to_artifact_id)
        } else if self.to_artifact_id == id {
            Some(self.from_artifact_id)
        } else {
            None
        }
    }
}

/// Parent named by a lineage hint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageParent {
    /// Parent exists in the registry
    Resolved(ArtifactId),
    /// Parent known only by name
    Placeholder(String),
}

/// A parent reference extracted from a model's configuration or card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageHint {
    pub parent: LineageParent,
    pub relationship: RelationshipType,
    /// Where the hint was found, e.g. `config.base_model`
    pub source: String,
}

impl LineageHint {
    pub fn new(
        parent: LineageParent,
        relationship: RelationshipType,
        source: impl Into<String>,
    ) -> Self {
        Self {
            parent,
            relationship,
            source: source.into(),
        }
    }
}

/// Where a lineage node was learned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeSource {
    /// A model stored in the registry
    #[serde(rename = "database")]
    Registry,
    /// A parent named only by a model's config or card
    #[serde(rename = "config_json")]
    ConfigReference,
}

/// A node in a lineage graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    /// Artifact id as a string, or `external:<name>` for placeholders
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<ArtifactId>,
    pub name: String,
    pub source: NodeSource,
}

impl LineageNode {
    pub fn artifact(id: ArtifactId, name: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            artifact_id: Some(id),
            name: name.into(),
            source: NodeSource::Registry,
        }
    }

    pub fn external(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: format!("{}{}", EXTERNAL_NODE_PREFIX, name),
            artifact_id: None,
            name,
            source: NodeSource::ConfigReference,
        }
    }

    pub fn is_external(&self) -> bool {
        self.artifact_id.is_none()
    }
}

/// A directed edge in a lineage graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageEdge {
    pub from: String,
    pub to: String,
    pub relationship: RelationshipType,
}

/// Lineage graph rooted at one model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node unless one with the same id is present
    pub fn add_node(&mut self, node: LineageNode) -> bool {
        if self.contains_node(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Add an edge; self-loops and structural duplicates are dropped
    pub fn add_edge(&mut self, edge: LineageEdge) -> bool {
        if edge.from == edge.to || self.edges.contains(&edge) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
