//! Cross-module tests for resolution, grants and compilation.

#[cfg(test)]
mod tests {
    use crate::artifacts::{ArtifactStore, InMemoryArtifactStore};
    use crate::core::{ArtifactReference, ImageRepositorySpec, Permission, RepositoryRef, Resource};
    use crate::errors::StagelineError;
    use crate::pipeline::{AccessGrantResolver, PipelineCompiler, PipelineGraph, Stage};
    use crate::testing::{assert_grant, assert_no_duplicate_grants, test_config};
    use std::collections::HashSet;
    use std::thread;

    fn chain(len: usize) -> PipelineGraph {
        let mut graph = PipelineGraph::new("chain", test_config());
        let mut previous = graph.add_stage(
            Stage::new("stage-0", RepositoryRef::github("o", "app")).with_output("out"),
        );
        for i in 1..len {
            previous = graph.add_stage(
                Stage::new(format!("stage-{i}"), previous.output("out")).with_output("out"),
            );
        }
        graph
    }

    #[test]
    fn test_every_slot_gets_exactly_one_address() {
        let resolved = chain(6).resolve().unwrap();

        let addresses: Vec<_> = resolved.output_addresses().map(|(_, _, a)| a.clone()).collect();
        let unique: HashSet<_> = addresses.iter().cloned().collect();
        assert_eq!(addresses.len(), 6);
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_rebuilt_graph_keeps_addresses() {
        let first = chain(4).resolve().unwrap();
        let second = chain(4).resolve().unwrap();

        let first: Vec<_> = first.output_addresses().map(|(_, _, a)| a.clone()).collect();
        let second: Vec<_> = second.output_addresses().map(|(_, _, a)| a.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chain_grants_are_minimal() {
        let resolved = chain(3).resolve().unwrap();
        let grants = AccessGrantResolver::new().resolve(&resolved);

        assert_no_duplicate_grants(&grants);
        assert_eq!(grants.len(), 6);
        assert_grant(&grants, "stage-1", "artifact:pipeline-artifacts/stage-0/out", Permission::Read);
        assert_grant(&grants, "stage-1", "artifact:pipeline-artifacts/stage-1/out", Permission::Write);
        assert!(grants
            .iter()
            .filter(|g| g.principal == "stage-2")
            .all(|g| g.resource.to_string().contains("stage-1/out") || g.resource.to_string().contains("stage-2/out")));
    }

    #[test]
    fn test_grant_sequence_is_stable() {
        let compiler = PipelineCompiler::new();
        let first: Vec<_> = compiler.compile(&chain(5)).unwrap().grants().cloned().collect();
        let second: Vec<_> = compiler.compile(&chain(5)).unwrap().grants().cloned().collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_independent_graphs_compile_in_parallel() {
        let handles: Vec<_> = (2..6)
            .map(|len| thread::spawn(move || PipelineCompiler::new().compile(&chain(len))))
            .collect();

        for (offset, handle) in handles.into_iter().enumerate() {
            let compiled = handle.join().unwrap().unwrap();
            assert_eq!(compiled.stages.len(), offset + 2);
        }
    }

    #[test]
    fn test_dangling_reference_blocks_compilation_before_addresses() {
        let mut graph = chain(2);
        graph.add_stage(Stage::new("report", ArtifactReference::new("stage-9", "out")));

        let err = PipelineCompiler::new().compile(&graph).unwrap_err();
        assert!(matches!(err, StagelineError::DanglingReference(_)));
        assert!(err.to_string().contains("stage-9/out"));
    }

    #[test]
    fn test_image_bindings_do_not_leak_between_stages() {
        let mut graph = PipelineGraph::new("images", test_config());
        let joern = graph.add_image_repository(ImageRepositorySpec::imported("joern-scanner"));
        let behave = graph.add_image_repository(ImageRepositorySpec::managed("behave-image"));
        graph.add_stage(Stage::new("scan", RepositoryRef::github("o", "app")).with_image(joern.pull()));
        graph.add_stage(Stage::new("package", RepositoryRef::github("o", "tests")).with_image(behave.pull_push()));

        let compiled = PipelineCompiler::new().compile(&graph).unwrap();
        let scan = compiled.stage("scan").unwrap();
        assert!(!scan
            .grants
            .iter()
            .any(|g| g.resource == Resource::ImageRepository("behave-image".into())));
        assert_grant(&compiled.stage("package").unwrap().grants, "package", "image:behave-image", Permission::ReadWrite);
    }

    #[tokio::test]
    async fn test_downstream_reads_what_upstream_wrote() {
        let compiled = PipelineCompiler::new().compile(&chain(2)).unwrap();
        let store = InMemoryArtifactStore::new();

        let produced = compiled.stage("stage-0").unwrap().output("out").unwrap().clone();
        store.put(&produced, b"payload".to_vec()).await.unwrap();

        let consumed = compiled.stage("stage-1").unwrap().source_address.clone().unwrap();
        assert_eq!(store.get(&consumed).await.unwrap(), b"payload".to_vec());
    }
}
