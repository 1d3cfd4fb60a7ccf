//! Pipeline compilation: the terminal, side-effect-free transformation.

use super::{AccessGrantResolver, PipelineGraph, ResolvedGraph, ResolvedNode, Stage};
use crate::artifacts::Address;
use crate::config::PipelineConfig;
use crate::core::{EnvValue, Grant, ImageRepositorySpec};
use crate::errors::StagelineError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// A stage with every reference resolved, ready to be provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStage {
    /// The stage declaration.
    pub stage: Stage,
    /// Address of the consumed artifact, for artifact-sourced stages.
    pub source_address: Option<Address>,
    /// Output addresses by slot, in declaration order.
    pub outputs: IndexMap<String, Address>,
    /// Environment bindings with configuration and repository values filled in.
    pub environment: BTreeMap<String, String>,
    /// Stages that must complete first.
    pub upstream: Vec<String>,
    /// Grants held by the stage.
    pub grants: Vec<Grant>,
}

impl ResolvedStage {
    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.stage.name
    }

    /// Returns the address of an output slot.
    #[must_use]
    pub fn output(&self, slot: &str) -> Option<&Address> {
        self.outputs.get(slot)
    }
}

/// An image repository with its registry URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRepository {
    /// The declaration.
    #[serde(flatten)]
    pub spec: ImageRepositorySpec,
    /// Registry URI.
    pub uri: String,
}

/// The compiler's output: everything a provisioning layer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPipeline {
    /// Pipeline name.
    pub name: String,
    /// Bucket holding stage outputs.
    pub artifact_bucket: String,
    /// Image repositories in declaration order.
    pub repositories: Vec<CompiledRepository>,
    /// Stages in declaration order.
    pub stages: Vec<ResolvedStage>,
    /// Stage names in dependency order.
    pub execution_order: Vec<String>,
}

impl CompiledPipeline {
    /// Looks up a compiled stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&ResolvedStage> {
        self.stages.iter().find(|stage| stage.name() == name)
    }

    /// Iterates over the grants of every stage, in declaration order.
    pub fn grants(&self) -> impl Iterator<Item = &Grant> {
        self.stages.iter().flat_map(|stage| stage.grants.iter())
    }
}

/// Turns pipeline graphs into provisionable definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineCompiler {
    grants: AccessGrantResolver,
}

impl PipelineCompiler {
    /// Creates a compiler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves and compiles a graph.
    ///
    /// # Errors
    ///
    /// Returns any error raised by [`PipelineGraph::resolve`].
    pub fn compile(&self, graph: &PipelineGraph) -> Result<CompiledPipeline, StagelineError> {
        let resolved = graph.resolve()?;
        Ok(self.compile_resolved(&resolved))
    }

    /// Compiles an already resolved graph.
    #[must_use]
    pub fn compile_resolved(&self, graph: &ResolvedGraph) -> CompiledPipeline {
        let config = graph.config();
        let stages: Vec<ResolvedStage> = graph
            .stages()
            .iter()
            .map(|node| self.compile_stage(config, node))
            .collect();

        let repositories = graph
            .repositories()
            .iter()
            .map(|spec| CompiledRepository {
                spec: spec.clone(),
                uri: config.repository_uri(&spec.name),
            })
            .collect();

        let compiled = CompiledPipeline {
            name: graph.name().to_string(),
            artifact_bucket: config.artifact_bucket.clone(),
            repositories,
            stages,
            execution_order: graph.execution_order().to_vec(),
        };

        info!(
            pipeline = %compiled.name,
            stages = compiled.stages.len(),
            grants = compiled.grants().count(),
            "pipeline compiled"
        );
        compiled
    }

    fn compile_stage(&self, config: &PipelineConfig, node: &ResolvedNode) -> ResolvedStage {
        let environment = node
            .stage()
            .environment
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), resolve_env_value(config, value)))
            .collect();

        ResolvedStage {
            stage: node.stage().clone(),
            source_address: node.source_address().cloned(),
            outputs: node.outputs().clone(),
            environment,
            upstream: node.upstream().to_vec(),
            grants: self.grants.resolve_stage(node),
        }
    }
}

fn resolve_env_value(config: &PipelineConfig, value: &EnvValue) -> String {
    match value {
        EnvValue::Literal(literal) => literal.clone(),
        EnvValue::AccountId => config.account_id.clone(),
        EnvValue::Region => config.region.clone(),
        EnvValue::ArtifactBucket => config.artifact_bucket.clone(),
        EnvValue::ImageRepositoryUri(name) => config.repository_uri(name),
        EnvValue::ImageRepositoryName(name) => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactReference, BuildEnvironment, Permission, RepositoryRef, Resource};
    use crate::testing::test_config;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_then_scan() {
        let mut graph = PipelineGraph::new("ci", test_config());
        let build = graph.add_stage(Stage::new("build", RepositoryRef::github("x", "app")).with_output("jar"));
        graph.add_stage(Stage::new("scan", build.output("jar")));

        let compiled = PipelineCompiler::new().compile(&graph).unwrap();

        let build = compiled.stage("build").unwrap();
        assert_eq!(build.output("jar").map(Address::key), Some("build/jar"));
        assert!(build.source_address.is_none());

        let scan = compiled.stage("scan").unwrap();
        assert_eq!(scan.source_address.as_ref().map(Address::key), Some("build/jar"));
        assert_eq!(
            scan.grants,
            vec![Grant::new(
                "scan",
                Resource::Artifact(Address::new("pipeline-artifacts", "build/jar")),
                Permission::Read
            )]
        );
    }

    #[test]
    fn test_missing_producer_fails() {
        let mut graph = PipelineGraph::new("ci", test_config());
        graph.add_stage(Stage::new("scan", ArtifactReference::new("build", "jar")));

        match PipelineCompiler::new().compile(&graph) {
            Err(StagelineError::DanglingReference(err)) => {
                assert_eq!(err.stage, "scan");
                assert_eq!(err.slot, "build/jar");
            }
            other => panic!("expected dangling reference, got {other:?}"),
        }
    }

    #[test]
    fn test_environment_resolution() {
        let mut graph = PipelineGraph::new("ci", test_config());
        let webgoat = graph.add_image_repository(ImageRepositorySpec::managed("webgoat-image"));
        let env = BuildEnvironment::new()
            .with_variable("AWS_ACCOUNT_ID", EnvValue::AccountId)
            .with_variable("REGION", EnvValue::Region)
            .with_variable("BUCKET", EnvValue::ArtifactBucket)
            .with_variable("ECR_URL", webgoat.uri())
            .with_variable("ECR_NAME", webgoat.name_value())
            .with_variable("APP_URL", "http://webgoat.svc.test.local:8080");
        graph.add_stage(Stage::new("deploy", RepositoryRef::github("x", "app")).with_environment(env));

        let compiled = PipelineCompiler::new().compile(&graph).unwrap();
        let environment = &compiled.stage("deploy").unwrap().environment;

        assert_eq!(environment["AWS_ACCOUNT_ID"], "123456789012");
        assert_eq!(environment["REGION"], "eu-west-1");
        assert_eq!(environment["BUCKET"], "pipeline-artifacts");
        assert_eq!(
            environment["ECR_URL"],
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com/webgoat-image"
        );
        assert_eq!(environment["ECR_NAME"], "webgoat-image");
        assert_eq!(environment["APP_URL"], "http://webgoat.svc.test.local:8080");
        assert_eq!(
            compiled.repositories[0].uri,
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com/webgoat-image"
        );
    }

    #[test]
    fn test_recompile_is_identical() {
        let mut graph = PipelineGraph::new("ci", test_config());
        let build = graph.add_stage(Stage::new("build", RepositoryRef::github("x", "app")).with_output("jar"));
        graph.add_stage(Stage::new("scan", build.output("jar")));

        let compiler = PipelineCompiler::new();
        assert_eq!(compiler.compile(&graph).unwrap(), compiler.compile(&graph).unwrap());
    }
}
