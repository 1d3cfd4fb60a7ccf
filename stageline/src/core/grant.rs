//! Resources, permissions and grants.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::artifacts::Address;

/// Access level on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Read and write.
    ReadWrite,
}

impl Permission {
    /// Combines two permissions on the same resource.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::ReadWrite
        }
    }

    /// Whether reading is allowed.
    #[must_use]
    pub fn allows_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Whether writing is allowed.
    #[must_use]
    pub fn allows_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Something a stage can be granted access to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Resource {
    /// An artifact location in the object store.
    Artifact(Address),
    /// An external source repository, as `host:owner/name`.
    SourceRepository(String),
    /// An image repository, by name.
    ImageRepository(String),
    /// An execution role, by name.
    ExecutionRole(String),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact(address) => write!(f, "artifact:{}", address.location()),
            Self::SourceRepository(id) => write!(f, "repository:{id}"),
            Self::ImageRepository(name) => write!(f, "image:{name}"),
            Self::ExecutionRole(name) => write!(f, "role:{name}"),
        }
    }
}

/// A permission binding a stage to one resource it touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    /// The stage holding the grant.
    pub principal: String,
    /// The resource accessed.
    pub resource: Resource,
    /// The access level.
    pub permission: Permission,
}

impl Grant {
    /// Creates a grant.
    #[must_use]
    pub fn new(principal: impl Into<String>, resource: Resource, permission: Permission) -> Self {
        Self {
            principal: principal.into(),
            resource,
            permission,
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.principal, self.permission, self.resource)
    }
}
