//! Stage declarations.

use crate::core::{ArtifactReference, BuildEnvironment, ImageBinding, RepositoryRef, StageSource};
use crate::errors::{
    ContractErrorInfo, PipelineValidationError, CODE_DUPLICATE_SLOT, CODE_SECONDARY_SOURCE,
};
use crate::utils::{validate_name, NameKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One build, scan, packaging or deployment job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// The unique name of the stage.
    pub name: String,
    /// The primary input.
    pub source: StageSource,
    /// Execution environment.
    #[serde(default)]
    pub environment: BuildEnvironment,
    /// Output slots, in declaration order.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Extra repositories checked out next to the primary source.
    #[serde(default)]
    pub secondary_sources: Vec<RepositoryRef>,
    /// Image repositories the stage pulls from or pushes to.
    #[serde(default)]
    pub images: Vec<ImageBinding>,
    /// Execution role the stage assumes instead of the default one.
    #[serde(default)]
    pub role: Option<String>,
    /// Path of the build script definition.
    #[serde(default)]
    pub script: Option<String>,
    /// Network placement for stages that must reach private services.
    #[serde(default)]
    pub network: Option<String>,
    /// Stages that must finish first without handing over an artifact.
    #[serde(default)]
    pub after: Vec<String>,
}

impl Stage {
    /// Creates a stage with the default environment and no outputs.
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<StageSource>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            environment: BuildEnvironment::default(),
            outputs: Vec::new(),
            secondary_sources: Vec::new(),
            images: Vec::new(),
            role: None,
            script: None,
            network: None,
            after: Vec::new(),
        }
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: BuildEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Declares an output slot.
    #[must_use]
    pub fn with_output(mut self, slot: impl Into<String>) -> Self {
        self.outputs.push(slot.into());
        self
    }

    /// Declares several output slots.
    #[must_use]
    pub fn with_outputs(mut self, slots: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.outputs.extend(slots.into_iter().map(Into::into));
        self
    }

    /// Adds a secondary source.
    #[must_use]
    pub fn with_secondary_source(mut self, source: RepositoryRef) -> Self {
        self.secondary_sources.push(source);
        self
    }

    /// Binds an image repository.
    #[must_use]
    pub fn with_image(mut self, binding: ImageBinding) -> Self {
        self.images.push(binding);
        self
    }

    /// Sets the execution role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sets the build script path.
    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Sets the network placement.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Adds an ordering edge: this stage runs after `stage`.
    #[must_use]
    pub fn run_after(mut self, stage: impl Into<String>) -> Self {
        self.after.push(stage.into());
        self
    }

    /// Returns the artifact this stage consumes, if any.
    #[must_use]
    pub fn consumes(&self) -> Option<&ArtifactReference> {
        self.source.as_artifact()
    }

    /// Returns true if the stage declares `slot`.
    #[must_use]
    pub fn declares(&self, slot: &str) -> bool {
        self.outputs.iter().any(|s| s == slot)
    }

    /// Validates what can be checked without the rest of the graph.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name, an invalid or repeated slot,
    /// or secondary sources without a unique identifier.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        validate_name(NameKind::Stage, &self.name)?;

        let mut slots = HashSet::new();
        for slot in &self.outputs {
            validate_name(NameKind::Slot, slot)?;
            if !slots.insert(slot.as_str()) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' declares output slot '{}' more than once",
                    self.name, slot
                ))
                .with_stages(vec![self.name.clone()])
                .with_error_info(
                    ContractErrorInfo::new(CODE_DUPLICATE_SLOT, format!("Slot '{slot}' is repeated"))
                        .with_context_entry("stage", &self.name)
                        .with_context_entry("slot", slot),
                ));
            }
        }

        let mut identifiers = HashSet::new();
        for source in &self.secondary_sources {
            let Some(ref identifier) = source.identifier else {
                return Err(secondary_source_error(
                    &self.name,
                    format!("Secondary source '{source}' of stage '{}' has no identifier", self.name),
                ));
            };
            validate_name(NameKind::SourceIdentifier, identifier)?;
            if !identifiers.insert(identifier.as_str()) {
                return Err(secondary_source_error(
                    &self.name,
                    format!(
                        "Stage '{}' uses secondary source identifier '{identifier}' more than once",
                        self.name
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn secondary_source_error(stage: &str, message: String) -> PipelineValidationError {
    PipelineValidationError::new(message.clone())
        .with_stages(vec![stage.to_string()])
        .with_error_info(
            ContractErrorInfo::new(CODE_SECONDARY_SOURCE, message)
                .with_fix_hint("Call with_identifier on every secondary source.")
                .with_context_entry("stage", stage),
        )
}
