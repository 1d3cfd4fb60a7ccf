//! Resolved pipeline graphs.

use super::Stage;
use crate::artifacts::{Address, AddressingScheme};
use crate::config::PipelineConfig;
use crate::core::{ArtifactReference, ImageRepositorySpec};
use indexmap::IndexMap;

/// A stage together with the addresses computed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    stage: Stage,
    source_address: Option<Address>,
    outputs: IndexMap<String, Address>,
    upstream: Vec<String>,
}

impl ResolvedNode {
    pub(crate) fn new(
        stage: Stage,
        source_address: Option<Address>,
        outputs: IndexMap<String, Address>,
        upstream: Vec<String>,
    ) -> Self {
        Self {
            stage,
            source_address,
            outputs,
            upstream,
        }
    }

    /// Returns the stage declaration.
    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.stage.name
    }

    /// Returns the address of the consumed artifact, if the source is one.
    #[must_use]
    pub fn source_address(&self) -> Option<&Address> {
        self.source_address.as_ref()
    }

    /// Returns the output addresses by slot, in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &IndexMap<String, Address> {
        &self.outputs
    }

    /// Returns the stages this one waits for.
    #[must_use]
    pub fn upstream(&self) -> &[String] {
        &self.upstream
    }
}

/// A pipeline whose references are validated and whose outputs are addressed.
///
/// Only [`super::PipelineGraph::resolve`] creates one, so holding a
/// `ResolvedGraph` proves the declaration is consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGraph {
    name: String,
    config: PipelineConfig,
    nodes: Vec<ResolvedNode>,
    repositories: Vec<ImageRepositorySpec>,
    execution_order: Vec<String>,
}

impl ResolvedGraph {
    pub(crate) fn new(
        name: String,
        config: PipelineConfig,
        nodes: Vec<ResolvedNode>,
        repositories: Vec<ImageRepositorySpec>,
        execution_order: Vec<String>,
    ) -> Self {
        Self {
            name,
            config,
            nodes,
            repositories,
            execution_order,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration the graph was resolved with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the resolved stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[ResolvedNode] {
        &self.nodes
    }

    /// Looks up a resolved stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&ResolvedNode> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Returns the declared image repositories.
    #[must_use]
    pub fn repositories(&self) -> &[ImageRepositorySpec] {
        &self.repositories
    }

    /// Returns stage names in an order that respects every dependency.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    /// Returns the address assigned to a referenced slot.
    #[must_use]
    pub fn address_of(&self, reference: &ArtifactReference) -> Option<&Address> {
        self.stage(&reference.producing_stage)
            .and_then(|node| node.outputs.get(&reference.slot))
    }

    /// Iterates over every `(stage, slot, address)` triple.
    pub fn output_addresses(&self) -> impl Iterator<Item = (&str, &str, &Address)> {
        self.nodes.iter().flat_map(|node| {
            node.outputs
                .iter()
                .map(move |(slot, address)| (node.name(), slot.as_str(), address))
        })
    }

    /// Returns the addressing scheme the graph was resolved with.
    #[must_use]
    pub fn addressing(&self) -> AddressingScheme {
        AddressingScheme::from_config(&self.config)
    }

    /// Returns the URI of a declared image repository.
    #[must_use]
    pub fn repository_uri(&self, name: &str) -> Option<String> {
        self.repositories
            .iter()
            .any(|r| r.name == name)
            .then(|| self.config.repository_uri(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RepositoryRef;
    use crate::pipeline::PipelineGraph;
    use crate::testing::test_config;

    fn resolved() -> ResolvedGraph {
        let mut graph = PipelineGraph::new("ci", test_config());
        graph.add_image_repository(ImageRepositorySpec::managed("webgoat-image"));
        let build = graph.add_stage(Stage::new("build", RepositoryRef::github("o", "r")).with_output("jar"));
        graph.add_stage(Stage::new("scan", build.output("jar")));
        graph.resolve().unwrap()
    }

    #[test]
    fn test_lookup() {
        let graph = resolved();

        assert_eq!(graph.name(), "ci");
        assert_eq!(graph.stage("scan").unwrap().upstream(), ["build"]);
        assert!(graph.stage("deploy").is_none());
        assert_eq!(
            graph.stage("scan").unwrap().source_address().map(Address::key),
            Some("build/jar")
        );
    }

    #[test]
    fn test_address_of() {
        let graph = resolved();
        let address = graph.address_of(&ArtifactReference::new("build", "jar")).unwrap();

        assert_eq!(address, &graph.addressing().allocate("build", "jar"));
        assert!(graph.address_of(&ArtifactReference::new("build", "war")).is_none());
    }

    #[test]
    fn test_repository_uri() {
        let graph = resolved();
        assert_eq!(
            graph.repository_uri("webgoat-image").as_deref(),
            Some("123456789012.dkr.ecr.eu-west-1.amazonaws.com/webgoat-image")
        );
        assert!(graph.repository_uri("missing").is_none());
    }
}
