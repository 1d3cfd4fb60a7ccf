//! Pipeline graph declaration and resolution.

use super::{ResolvedGraph, ResolvedNode, Stage};
use crate::artifacts::AddressingScheme;
use crate::config::PipelineConfig;
use crate::core::{ArtifactReference, EnvValue, ImageAccess, ImageBinding, ImageRepositorySpec};
use crate::errors::{
    ContractErrorInfo, CycleDetectedError, DanglingReferenceError, DuplicateStageNameError,
    PipelineValidationError, StagelineError, UnknownSlotError,
    CODE_DUPLICATE_REPOSITORY, CODE_UNKNOWN_REPOSITORY, CODE_UNKNOWN_STAGE,
};
use crate::utils::{find_cycle, topological_order, validate_name, NameKind};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Handle to a declared stage, used to reference its output slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageHandle {
    name: String,
    index: usize,
}

impl StageHandle {
    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declaration position.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns a reference to one of the stage's output slots.
    ///
    /// The slot is checked when the graph is resolved.
    #[must_use]
    pub fn output(&self, slot: impl Into<String>) -> ArtifactReference {
        ArtifactReference::new(self.name.clone(), slot)
    }
}

/// Handle to a declared image repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRepositoryHandle {
    name: String,
}

impl ImageRepositoryHandle {
    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binding for a stage that pulls from this repository.
    #[must_use]
    pub fn pull(&self) -> ImageBinding {
        ImageBinding::new(self.name.clone(), ImageAccess::Pull)
    }

    /// Binding for a stage that pushes to this repository.
    #[must_use]
    pub fn push(&self) -> ImageBinding {
        ImageBinding::new(self.name.clone(), ImageAccess::Push)
    }

    /// Binding for a stage that pulls from and pushes to this repository.
    #[must_use]
    pub fn pull_push(&self) -> ImageBinding {
        ImageBinding::new(self.name.clone(), ImageAccess::PullPush)
    }

    /// Environment value resolving to the repository URI.
    #[must_use]
    pub fn uri(&self) -> EnvValue {
        EnvValue::ImageRepositoryUri(self.name.clone())
    }

    /// Environment value resolving to the repository name.
    #[must_use]
    pub fn name_value(&self) -> EnvValue {
        EnvValue::ImageRepositoryName(self.name.clone())
    }
}

/// An ordered declaration of stages and the image repositories they use.
///
/// Declaration order matters: an artifact source may only name a slot of a
/// stage declared before it. A graph is declared once and resolved; any
/// topology change means building a new graph.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    name: String,
    config: PipelineConfig,
    stages: Vec<Stage>,
    repositories: Vec<ImageRepositorySpec>,
}

impl PipelineGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(name: impl Into<String>, config: PipelineConfig) -> Self {
        Self {
            name: name.into(),
            config,
            stages: Vec::new(),
            repositories: Vec::new(),
        }
    }

    /// Appends a stage and returns a handle to its output slots.
    pub fn add_stage(&mut self, stage: Stage) -> StageHandle {
        let handle = StageHandle {
            name: stage.name.clone(),
            index: self.stages.len(),
        };
        debug!(pipeline = %self.name, stage = %stage.name, index = handle.index, "stage declared");
        self.stages.push(stage);
        handle
    }

    /// Declares an image repository.
    pub fn add_image_repository(&mut self, spec: ImageRepositorySpec) -> ImageRepositoryHandle {
        let handle = ImageRepositoryHandle {
            name: spec.name.clone(),
        };
        self.repositories.push(spec);
        handle
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the declared image repositories.
    #[must_use]
    pub fn repositories(&self) -> &[ImageRepositorySpec] {
        &self.repositories
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Validates the graph and assigns an address to every output slot.
    ///
    /// # Errors
    ///
    /// - [`StagelineError::Config`] for an invalid configuration
    /// - [`StagelineError::DuplicateStageName`] when two stages share a name
    /// - [`StagelineError::DanglingReference`] when an artifact source names a
    ///   stage that is missing or not declared strictly earlier
    /// - [`StagelineError::UnknownSlot`] when the earlier producer lacks the slot
    /// - [`StagelineError::CycleDetected`] when ordering edges loop
    /// - [`StagelineError::Validation`] for invalid names, unknown image
    ///   repositories and ordering edges to unknown stages
    pub fn resolve(&self) -> Result<ResolvedGraph, StagelineError> {
        self.config.validate()?;
        validate_name(NameKind::Pipeline, &self.name)?;

        let repositories = self.validate_repositories()?;
        let positions = self.validate_stages()?;

        self.validate_artifact_sources(&positions)?;
        self.validate_image_bindings(&repositories)?;
        let edges = self.ordering_edges(&positions)?;

        if let Some(cycle) = find_cycle(&edges) {
            return Err(CycleDetectedError::new(cycle).into());
        }

        let scheme = AddressingScheme::from_config(&self.config);
        let nodes: Vec<ResolvedNode> = self
            .stages
            .iter()
            .map(|stage| {
                let outputs: IndexMap<String, _> = stage
                    .outputs
                    .iter()
                    .map(|slot| (slot.clone(), scheme.allocate(&stage.name, slot)))
                    .collect();
                let source_address = stage
                    .consumes()
                    .map(|r| scheme.allocate(&r.producing_stage, &r.slot));
                let upstream = edges.get(&stage.name).cloned().unwrap_or_default();
                ResolvedNode::new(stage.clone(), source_address, outputs, upstream)
            })
            .collect();

        let order = topological_order(&edges);
        info!(
            pipeline = %self.name,
            stages = nodes.len(),
            repositories = self.repositories.len(),
            "pipeline graph resolved"
        );

        Ok(ResolvedGraph::new(
            self.name.clone(),
            self.config.clone(),
            nodes,
            self.repositories.clone(),
            order,
        ))
    }

    fn validate_repositories(&self) -> Result<HashSet<&str>, StagelineError> {
        let mut names = HashSet::new();
        for repository in &self.repositories {
            validate_name(NameKind::Repository, &repository.name)?;
            if !names.insert(repository.name.as_str()) {
                let message = format!("Image repository '{}' is declared more than once", repository.name);
                return Err(PipelineValidationError::new(message.clone())
                    .with_error_info(
                        ContractErrorInfo::new(CODE_DUPLICATE_REPOSITORY, message)
                            .with_fix_hint("Declare the repository once and share its handle between stages.")
                            .with_context_entry("repository", &repository.name),
                    )
                    .into());
            }
        }
        Ok(names)
    }

    fn validate_stages(&self) -> Result<HashMap<&str, usize>, StagelineError> {
        let mut positions = HashMap::new();
        for (index, stage) in self.stages.iter().enumerate() {
            stage.validate()?;
            if positions.insert(stage.name.as_str(), index).is_some() {
                return Err(DuplicateStageNameError::new(&stage.name).into());
            }
        }
        Ok(positions)
    }

    fn validate_artifact_sources(&self, positions: &HashMap<&str, usize>) -> Result<(), StagelineError> {
        for (index, stage) in self.stages.iter().enumerate() {
            let Some(reference) = stage.consumes() else {
                continue;
            };
            match positions.get(reference.producing_stage.as_str()) {
                Some(&producer) if producer < index => {
                    if !self.stages[producer].declares(&reference.slot) {
                        return Err(UnknownSlotError::new(
                            &stage.name,
                            &reference.producing_stage,
                            &reference.slot,
                        )
                        .into());
                    }
                }
                _ => {
                    return Err(DanglingReferenceError::new(&stage.name, reference.to_string()).into());
                }
            }
        }
        Ok(())
    }

    fn validate_image_bindings(&self, repositories: &HashSet<&str>) -> Result<(), StagelineError> {
        for stage in &self.stages {
            let bound = stage.images.iter().map(|b| b.repository.as_str());
            let referenced = stage.environment.variables.values().filter_map(EnvValue::repository);
            for repository in bound.chain(referenced) {
                if !repositories.contains(repository) {
                    let message = format!(
                        "Stage '{}' uses image repository '{repository}' which is not declared",
                        stage.name
                    );
                    return Err(PipelineValidationError::new(message.clone())
                        .with_stages(vec![stage.name.clone()])
                        .with_error_info(
                            ContractErrorInfo::new(CODE_UNKNOWN_REPOSITORY, message)
                                .with_fix_hint("Declare it with add_image_repository.")
                                .with_context_entry("stage", &stage.name)
                                .with_context_entry("repository", repository),
                        )
                        .into());
                }
            }
        }
        Ok(())
    }

    /// Collects, per stage, the stages it waits for: the producer of its
    /// artifact source followed by its explicit ordering edges.
    fn ordering_edges(
        &self,
        positions: &HashMap<&str, usize>,
    ) -> Result<IndexMap<String, Vec<String>>, StagelineError> {
        let mut edges = IndexMap::new();
        for stage in &self.stages {
            let mut upstream: Vec<String> = Vec::new();
            if let Some(reference) = stage.consumes() {
                upstream.push(reference.producing_stage.clone());
            }
            for dependency in &stage.after {
                if !positions.contains_key(dependency.as_str()) {
                    let message = format!(
                        "Stage '{}' runs after unknown stage '{dependency}'",
                        stage.name
                    );
                    return Err(PipelineValidationError::new(message.clone())
                        .with_stages(vec![stage.name.clone(), dependency.clone()])
                        .with_error_info(
                            ContractErrorInfo::new(CODE_UNKNOWN_STAGE, message)
                                .with_context_entry("stage", &stage.name)
                                .with_context_entry("dependency", dependency),
                        )
                        .into());
                }
                if !upstream.contains(dependency) {
                    upstream.push(dependency.clone());
                }
            }
            edges.insert(stage.name.clone(), upstream);
        }
        Ok(edges)
    }
}
