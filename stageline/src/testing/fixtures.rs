//! Test fixtures for pipeline tests.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::core::RepositoryRef;
use crate::errors::StagelineError;
use crate::pipeline::{CompiledPipeline, PipelineGraph, Stage};
use crate::provisioning::ProvisioningSink;

/// Account id used by [`test_config`].
pub const TEST_ACCOUNT_ID: &str = "123456789012";
/// Region used by [`test_config`].
pub const TEST_REGION: &str = "eu-west-1";
/// Artifact bucket used by [`test_config`].
pub const TEST_BUCKET: &str = "pipeline-artifacts";

/// Returns a valid configuration with fixed values.
#[must_use]
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        account_id: TEST_ACCOUNT_ID.to_string(),
        region: TEST_REGION.to_string(),
        artifact_bucket: TEST_BUCKET.to_string(),
        artifact_prefix: None,
        registry_host: None,
        context: std::collections::BTreeMap::new(),
    }
}

/// Returns the two-stage graph `build` (repository `x/app`, slot `jar`)
/// followed by `scan` consuming `build/jar`.
#[must_use]
pub fn build_and_scan() -> PipelineGraph {
    let mut graph = PipelineGraph::new("build-and-scan", test_config());
    let build = graph.add_stage(Stage::new("build", RepositoryRef::github("x", "app")).with_output("jar"));
    graph.add_stage(Stage::new("scan", build.output("jar")));
    graph
}

/// A provisioning sink that keeps every pipeline it receives.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    received: Arc<Mutex<Vec<CompiledPipeline>>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pipelines received so far.
    #[must_use]
    pub fn received(&self) -> Vec<CompiledPipeline> {
        self.received.lock().clone()
    }

    /// Returns the number of pipelines received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.received.lock().is_empty()
    }
}

impl ProvisioningSink for CollectingSink {
    fn accept(&mut self, pipeline: &CompiledPipeline) -> Result<(), StagelineError> {
        self.received.lock().push(pipeline.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_build_and_scan_resolves() {
        let graph = build_and_scan();
        assert_eq!(graph.stage_count(), 2);
        assert!(graph.resolve().is_ok());
    }

    #[test]
    fn test_collecting_sink_clones_share_state() {
        let sink = CollectingSink::new();
        let mut writer = sink.clone();
        let compiled = crate::pipeline::PipelineCompiler::new().compile(&build_and_scan()).unwrap();

        writer.accept(&compiled).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.received()[0].name, "build-and-scan");
    }
}
