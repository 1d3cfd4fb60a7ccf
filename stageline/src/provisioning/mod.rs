//! Hand-off of compiled pipelines to a provisioning layer.
//!
//! A [`ProvisioningSink`] receives a [`CompiledPipeline`](crate::pipeline::CompiledPipeline)
//! and materialises it. The crate ships a sink that writes the
//! [`PipelineManifest`] as JSON; talking to a real cloud API is left to
//! downstream sinks.

mod manifest;
mod sink;

pub use manifest::{ManifestGrant, ManifestOutputs, ManifestStage, PipelineManifest, MANIFEST_VERSION};
pub use sink::{JsonManifestSink, ProvisioningSink};
