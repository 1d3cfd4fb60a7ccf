//! Image repository declarations and stage bindings to them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Permission;

/// An image repository used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRepositorySpec {
    /// Repository name.
    pub name: String,
    /// Whether the repository is created with the pipeline, as opposed to
    /// imported by name.
    pub managed: bool,
    /// Whether pushed images are scanned.
    pub scan_on_push: bool,
    /// Whether tags may be overwritten.
    pub mutable_tags: bool,
}

impl ImageRepositorySpec {
    /// Declares a repository owned by this pipeline.
    #[must_use]
    pub fn managed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            managed: true,
            scan_on_push: true,
            mutable_tags: true,
        }
    }

    /// References an existing repository by name.
    #[must_use]
    pub fn imported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            managed: false,
            scan_on_push: false,
            mutable_tags: true,
        }
    }

    /// Disables scan on push.
    #[must_use]
    pub fn without_scan_on_push(mut self) -> Self {
        self.scan_on_push = false;
        self
    }

    /// Makes tags immutable.
    #[must_use]
    pub fn with_immutable_tags(mut self) -> Self {
        self.mutable_tags = false;
        self
    }
}

/// What a stage does with an image repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAccess {
    /// Pull images.
    Pull,
    /// Push images.
    Push,
    /// Pull and push images.
    PullPush,
}

impl ImageAccess {
    /// Whether the access reads from the repository.
    #[must_use]
    pub fn reads(self) -> bool {
        matches!(self, Self::Pull | Self::PullPush)
    }

    /// Whether the access writes to the repository.
    #[must_use]
    pub fn writes(self) -> bool {
        matches!(self, Self::Push | Self::PullPush)
    }

    /// The permission this access needs.
    #[must_use]
    pub fn permission(self) -> Permission {
        match self {
            Self::Pull => Permission::Read,
            Self::Push => Permission::Write,
            Self::PullPush => Permission::ReadWrite,
        }
    }
}

impl fmt::Display for ImageAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Push => write!(f, "push"),
            Self::PullPush => write!(f, "pull_push"),
        }
    }
}

/// A stage's binding to an image repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBinding {
    /// Repository name.
    pub repository: String,
    /// Access mode.
    pub access: ImageAccess,
}

impl ImageBinding {
    /// Creates a binding.
    #[must_use]
    pub fn new(repository: impl Into<String>, access: ImageAccess) -> Self {
        Self {
            repository: repository.into(),
            access,
        }
    }
}
