//! Build environment descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Container image used when a stage does not pick one.
pub const DEFAULT_BUILD_IMAGE: &str = "aws/codebuild/amazonlinux2-x86_64-standard:5.0";

/// Compute size of the container a stage runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeTier {
    /// Smallest build host.
    Small,
    /// General purpose build host.
    #[default]
    Medium,
    /// Large build host, used for analysis-heavy stages.
    Large,
    /// Extra large build host.
    XLarge,
}

impl fmt::Display for ComputeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
            Self::XLarge => write!(f, "xlarge"),
        }
    }
}

/// The value of an environment binding.
///
/// Anything derived from configuration or from a declared image repository
/// is kept symbolic until compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EnvValue {
    /// A fixed string.
    Literal(String),
    /// The configured account id.
    AccountId,
    /// The configured region.
    Region,
    /// The configured artifact bucket.
    ArtifactBucket,
    /// The URI of a declared image repository.
    ImageRepositoryUri(String),
    /// The name of a declared image repository.
    ImageRepositoryName(String),
}

impl EnvValue {
    /// Creates a literal value.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Returns the image repository this value refers to, if any.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        match self {
            Self::ImageRepositoryUri(name) | Self::ImageRepositoryName(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

/// Where and how a stage's build runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    /// Container image.
    pub image: String,
    /// Compute size.
    #[serde(default)]
    pub compute: ComputeTier,
    /// Whether the container runs privileged (needed to build images).
    #[serde(default)]
    pub privileged: bool,
    /// Environment bindings, ordered by name.
    #[serde(default)]
    pub variables: BTreeMap<String, EnvValue>,
}

impl Default for BuildEnvironment {
    fn default() -> Self {
        Self {
            image: DEFAULT_BUILD_IMAGE.to_string(),
            compute: ComputeTier::default(),
            privileged: false,
            variables: BTreeMap::new(),
        }
    }
}

impl BuildEnvironment {
    /// Creates an environment with the default image.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the container image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the compute tier.
    #[must_use]
    pub fn with_compute(mut self, compute: ComputeTier) -> Self {
        self.compute = compute;
        self
    }

    /// Marks the environment as privileged.
    #[must_use]
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Adds an environment binding.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<EnvValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}
