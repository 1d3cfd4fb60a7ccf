//! Least-privilege access grant resolution.

use super::{ResolvedGraph, ResolvedNode};
use crate::core::{Grant, Permission, Resource, StageSource};
use indexmap::IndexMap;
use tracing::debug;

/// Computes the grants each stage needs.
///
/// A stage gets exactly one grant per resource it touches:
/// - inputs (read): its primary source, its secondary sources, its
///   execution role and the image repositories it pulls from
/// - outputs (write): its output slots and the image repositories it
///   pushes to
///
/// Reads and writes of the same resource merge into a single
/// [`Permission::ReadWrite`] grant at the position of the first occurrence.
/// The sequence is ordered by stage declaration, then inputs before
/// outputs, so generated provisioning documents diff cleanly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGrantResolver;

impl AccessGrantResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the grants of every stage in the graph.
    #[must_use]
    pub fn resolve(&self, graph: &ResolvedGraph) -> Vec<Grant> {
        graph
            .stages()
            .iter()
            .flat_map(|node| self.resolve_stage(node))
            .collect()
    }

    /// Returns the grants of a single stage.
    #[must_use]
    pub fn resolve_stage(&self, node: &ResolvedNode) -> Vec<Grant> {
        let stage = node.stage();
        let mut touched: IndexMap<Resource, Permission> = IndexMap::new();
        let mut touch = |resource: Resource, permission: Permission| {
            touched
                .entry(resource)
                .and_modify(|existing| *existing = existing.merge(permission))
                .or_insert(permission);
        };

        match stage.source {
            StageSource::Repository(ref repository) => {
                touch(Resource::SourceRepository(repository.resource_id()), Permission::Read);
            }
            StageSource::Artifact(_) => {
                if let Some(address) = node.source_address() {
                    touch(Resource::Artifact(address.clone()), Permission::Read);
                }
            }
        }
        for repository in &stage.secondary_sources {
            touch(Resource::SourceRepository(repository.resource_id()), Permission::Read);
        }
        if let Some(ref role) = stage.role {
            touch(Resource::ExecutionRole(role.clone()), Permission::Read);
        }
        for binding in stage.images.iter().filter(|b| b.access.reads()) {
            touch(Resource::ImageRepository(binding.repository.clone()), Permission::Read);
        }

        for address in node.outputs().values() {
            touch(Resource::Artifact(address.clone()), Permission::Write);
        }
        for binding in stage.images.iter().filter(|b| b.access.writes()) {
            touch(Resource::ImageRepository(binding.repository.clone()), Permission::Write);
        }

        debug!(stage = %stage.name, grants = touched.len(), "grants resolved");

        touched
            .into_iter()
            .map(|(resource, permission)| Grant::new(stage.name.clone(), resource, permission))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::Address;
    use crate::core::{ImageRepositorySpec, RepositoryRef};
    use crate::pipeline::{PipelineGraph, Stage};
    use crate::testing::test_config;
    use pretty_assertions::assert_eq;

    fn artifact(key: &str) -> Resource {
        Resource::Artifact(Address::new("pipeline-artifacts", key))
    }

    #[test]
    fn test_reader_and_pusher_gets_exactly_two_grants() {
        let mut graph = PipelineGraph::new("ci", test_config());
        let registry = graph.add_image_repository(ImageRepositorySpec::managed("r"));
        let a = graph.add_stage(Stage::new("a", RepositoryRef::github("o", "app")).with_output("out"));
        graph.add_stage(Stage::new("b", a.output("out")).with_image(registry.push()));

        let resolved = graph.resolve().unwrap();
        let grants = AccessGrantResolver::new().resolve_stage(resolved.stage("b").unwrap());

        assert_eq!(
            grants,
            vec![
                Grant::new("b", artifact("a/out"), Permission::Read),
                Grant::new("b", Resource::ImageRepository("r".into()), Permission::Write),
            ]
        );
    }

    #[test]
    fn test_pull_push_merges_into_read_write() {
        let mut graph = PipelineGraph::new("ci", test_config());
        let behave = graph.add_image_repository(ImageRepositorySpec::managed("behave"));
        graph.add_stage(
            Stage::new("image", RepositoryRef::github("o", "scanner"))
                .with_image(behave.pull())
                .with_image(behave.push()),
        );

        let grants = AccessGrantResolver::new().resolve(&graph.resolve().unwrap());
        assert_eq!(
            grants,
            vec![
                Grant::new("image", Resource::SourceRepository("github:o/scanner".into()), Permission::Read),
                Grant::new("image", Resource::ImageRepository("behave".into()), Permission::ReadWrite),
            ]
        );
    }

    #[test]
    fn test_primary_and_secondary_on_same_repository_share_a_grant() {
        let repo = RepositoryRef::github("o", "scanner");
        let mut graph = PipelineGraph::new("ci", test_config());
        graph.add_stage(
            Stage::new("deploy", repo.clone().with_reference("main"))
                .with_secondary_source(repo.with_identifier("scripts"))
                .with_role("deploy-role"),
        );

        let grants = AccessGrantResolver::new().resolve(&graph.resolve().unwrap());
        assert_eq!(
            grants,
            vec![
                Grant::new("deploy", Resource::SourceRepository("github:o/scanner".into()), Permission::Read),
                Grant::new("deploy", Resource::ExecutionRole("deploy-role".into()), Permission::Read),
            ]
        );
    }

    #[test]
    fn test_order_is_stage_then_inputs_then_outputs() {
        let mut graph = PipelineGraph::new("ci", test_config());
        let joern = graph.add_image_repository(ImageRepositorySpec::imported("joern"));
        let build = graph.add_stage(Stage::new("build", RepositoryRef::github("o", "app")).with_outputs(["jar", "sbom"]));
        graph.add_stage(Stage::new("scan", build.output("jar")).with_output("report").with_image(joern.pull()));

        let grants = AccessGrantResolver::new().resolve(&graph.resolve().unwrap());
        let rendered: Vec<String> = grants.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "build read repository:github:o/app",
                "build write artifact:pipeline-artifacts/build/jar",
                "build write artifact:pipeline-artifacts/build/sbom",
                "scan read artifact:pipeline-artifacts/build/jar",
                "scan read image:joern",
                "scan write artifact:pipeline-artifacts/scan/report",
            ]
        );
    }

    #[test]
    fn test_untouched_resources_get_no_grant() {
        let mut graph = PipelineGraph::new("ci", test_config());
        graph.add_image_repository(ImageRepositorySpec::managed("unused"));
        let build = graph.add_stage(Stage::new("build", RepositoryRef::github("o", "app")).with_output("jar"));
        graph.add_stage(Stage::new("scan", build.output("jar")));

        let grants = AccessGrantResolver::new().resolve(&graph.resolve().unwrap());
        assert!(grants.iter().all(|g| g.resource != Resource::ImageRepository("unused".into())));
        assert!(grants
            .iter()
            .filter(|g| g.principal == "scan")
            .all(|g| g.permission == Permission::Read));
    }
}
