//! Artifact addressing and the object store contract.
//!
//! Addresses are a pure function of `(stage, slot)`: the same declaration
//! always yields the same keys, so downstream references never go stale
//! when a graph is rebuilt.

mod address;
mod store;

pub use address::{Address, AddressingScheme};
pub use store::{ArtifactStore, InMemoryArtifactStore, DEFAULT_VERSION_LIMIT};
