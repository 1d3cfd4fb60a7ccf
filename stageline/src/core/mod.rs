//! Core declaration types.
//!
//! This module contains the value types a pipeline is declared with:
//! - Stage sources and artifact references
//! - Build environment descriptors
//! - Image repository declarations and bindings
//! - Resources, permissions and grants

mod environment;
mod grant;
mod image;
mod source;

pub use environment::{BuildEnvironment, ComputeTier, EnvValue, DEFAULT_BUILD_IMAGE};
pub use grant::{Grant, Permission, Resource};
pub use image::{ImageAccess, ImageBinding, ImageRepositorySpec};
pub use source::{ArtifactReference, RepositoryRef, StageSource};
