//! # Stageline
//!
//! Declarative CI pipeline topologies with deterministic artifact
//! addressing and least-privilege access grants.
//!
//! Stageline models a fixed set of build, scan, packaging and deployment
//! stages as a graph and compiles it into a side-effect-free definition:
//!
//! - **Artifact addressing**: every output slot gets a stable `stage/slot` key
//! - **Reference validation**: consumers must name a slot on an earlier stage
//! - **Grant resolution**: each stage gets exactly the access it uses
//! - **Provisioning hand-off**: compiled pipelines serialise to a manifest
//!
//! ## Quick Start
//!
//! ```rust
//! use stageline::prelude::*;
//!
//! let config = PipelineConfig::new("123456789012", "eu-west-1")?;
//! let mut graph = PipelineGraph::new("ci", config);
//!
//! let build = graph.add_stage(
//!     Stage::new("build", RepositoryRef::github("acme", "app")).with_output("jar"),
//! );
//! graph.add_stage(Stage::new("scan", build.output("jar")));
//!
//! let compiled = PipelineCompiler::new().compile(&graph)?;
//! assert_eq!(compiled.stage("scan").unwrap().grants.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod config;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod provisioning;
pub mod testing;
pub mod topology;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifacts::{Address, AddressingScheme, ArtifactStore, InMemoryArtifactStore};
    pub use crate::config::PipelineConfig;
    pub use crate::core::{
        ArtifactReference, BuildEnvironment, ComputeTier, EnvValue, Grant, ImageAccess,
        ImageRepositorySpec, Permission, RepositoryRef, Resource, StageSource,
    };
    pub use crate::errors::{
        ConfigError, ContractErrorInfo, CycleDetectedError, DanglingReferenceError,
        DuplicateStageNameError, PipelineValidationError, StagelineError, StoreError,
        UnknownSlotError,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        AccessGrantResolver, CompiledPipeline, PipelineCompiler, PipelineGraph, ResolvedGraph,
        ResolvedStage, Stage, StageHandle,
    };
    pub use crate::provisioning::{JsonManifestSink, PipelineManifest, ProvisioningSink};
}
