//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Artifact identifier assigned by the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(i64);

impl ArtifactId {
    /// Wrap a raw persisted id
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the underlying integer
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ArtifactId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| format!("Invalid ArtifactId: {}", e))
    }
}

/// The three kinds of artifact tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A trained model, the only kind that is scored
    Model,
    /// A training or evaluation dataset
    Dataset,
    /// A code repository
    Code,
}

impl ArtifactKind {
    /// Get the string representation used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Dataset => "dataset",
            ArtifactKind::Code => "code",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(Self::Model),
            "dataset" => Ok(Self::Dataset),
            "code" => Ok(Self::Code),
            _ => Err(format!("Invalid artifact kind: {}", s)),
        }
    }
}

/// Hardware classes the size metric scores against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareClass {
    RaspberryPi,
    JetsonNano,
    DesktopPc,
    AwsServer,
}

impl HardwareClass {
    /// Every hardware class, in reporting order
    pub const ALL: [HardwareClass; 4] = [
        HardwareClass::RaspberryPi,
        HardwareClass::JetsonNano,
        HardwareClass::DesktopPc,
        HardwareClass::AwsServer,
    ];

    /// Memory ceiling in GiB
    pub const fn memory_ceiling_gb(&self) -> f64 {
        match self {
            HardwareClass::RaspberryPi => 8.0,
            HardwareClass::JetsonNano => 8.0,
            HardwareClass::DesktopPc => 32.0,
            HardwareClass::AwsServer => 128.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareClass::RaspberryPi => "raspberry_pi",
            HardwareClass::JetsonNano => "jetson_nano",
            HardwareClass::DesktopPc => "desktop_pc",
            HardwareClass::AwsServer => "aws_server",
        }
    }
}

impl fmt::Display for HardwareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type alias for tags
pub type Tags = Vec<String>;
