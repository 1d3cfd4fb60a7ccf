//! Pipeline declaration, resolution and compilation.
//!
//! This module provides:
//! - Stage declarations
//! - The pipeline graph and its resolution pass
//! - Least-privilege grant resolution
//! - The compiler producing provisionable stage definitions

mod compiler;
mod grants;
mod graph;
#[cfg(test)]
mod integration_tests;
mod resolved;
mod stage;

pub use compiler::{CompiledPipeline, CompiledRepository, PipelineCompiler, ResolvedStage};
pub use grants::AccessGrantResolver;
pub use graph::{ImageRepositoryHandle, PipelineGraph, StageHandle};
pub use resolved::{ResolvedGraph, ResolvedNode};
pub use stage::Stage;
