//! Stage inputs: external repositories and references to other stages' outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to an external source repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Hosting provider (e.g., "github").
    pub host: String,
    /// Repository owner or organisation.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Branch, tag or commit to check out. Provider default when unset.
    #[serde(default)]
    pub reference: Option<String>,
    /// Identifier distinguishing this source among a stage's secondary sources.
    #[serde(default)]
    pub identifier: Option<String>,
}

impl RepositoryRef {
    /// Creates a repository reference.
    #[must_use]
    pub fn new(host: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            owner: owner.into(),
            name: name.into(),
            reference: None,
            identifier: None,
        }
    }

    /// Creates a GitHub repository reference.
    #[must_use]
    pub fn github(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("github", owner, name)
    }

    /// Sets the branch, tag or commit.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the secondary source identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Returns `host:owner/name`, the identity access is granted on.
    ///
    /// The checked-out reference is not part of it: read access covers
    /// every branch of a repository.
    #[must_use]
    pub fn resource_id(&self) -> String {
        format!("{}:{}/{}", self.host, self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource_id())?;
        if let Some(ref reference) = self.reference {
            write!(f, "@{reference}")?;
        }
        Ok(())
    }
}

/// A pointer from one stage's input to another stage's output slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Name of the stage that writes the artifact.
    pub producing_stage: String,
    /// Output slot on that stage.
    pub slot: String,
}

impl ArtifactReference {
    /// Creates a reference by name.
    ///
    /// Prefer [`crate::pipeline::StageHandle::output`], which ties the
    /// reference to a declared stage.
    #[must_use]
    pub fn new(producing_stage: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            producing_stage: producing_stage.into(),
            slot: slot.into(),
        }
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.producing_stage, self.slot)
    }
}

/// The primary input of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageSource {
    /// Check out an external repository.
    Repository(RepositoryRef),
    /// Consume the output of an earlier stage.
    Artifact(ArtifactReference),
}

impl StageSource {
    /// Returns the artifact reference, if the source is one.
    #[must_use]
    pub fn as_artifact(&self) -> Option<&ArtifactReference> {
        match self {
            Self::Artifact(reference) => Some(reference),
            Self::Repository(_) => None,
        }
    }

    /// Returns the repository, if the source is one.
    #[must_use]
    pub fn as_repository(&self) -> Option<&RepositoryRef> {
        match self {
            Self::Repository(repository) => Some(repository),
            Self::Artifact(_) => None,
        }
    }
}

impl From<RepositoryRef> for StageSource {
    fn from(repository: RepositoryRef) -> Self {
        Self::Repository(repository)
    }
}

impl From<ArtifactReference> for StageSource {
    fn from(reference: ArtifactReference) -> Self {
        Self::Artifact(reference)
    }
}
