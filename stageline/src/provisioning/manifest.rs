//! Serialisable description of a compiled pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::errors::StagelineError;
use crate::pipeline::{CompiledPipeline, CompiledRepository, ResolvedStage};

/// Format version written into every manifest.
pub const MANIFEST_VERSION: u32 = 1;

/// A grant flattened to display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestGrant {
    /// Resource identifier, e.g. `artifact:bucket/build/jar`.
    pub resource: String,
    /// `read`, `write` or `read-write`.
    pub permission: String,
}

/// One stage as the provisioning layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStage {
    /// Stage name.
    pub name: String,
    /// Name of the build project backing the stage.
    pub project_name: String,
    /// Build image.
    pub image: String,
    /// Compute tier.
    pub compute: String,
    /// Whether the build runs privileged.
    pub privileged: bool,
    /// Primary source, as a repository or artifact location.
    pub source: String,
    /// Secondary source locations by identifier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secondary_sources: BTreeMap<String, String>,
    /// Output locations by slot.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, String>,
    /// Resolved environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Build script path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Execution role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Network placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Stages that must complete first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream: Vec<String>,
    /// Grants in resolution order.
    pub grants: Vec<ManifestGrant>,
}

/// Values exported to operators once the pipeline is provisioned.
///
/// Keyed by the declared names, which resolution guarantees to be unique
/// per kind, so no entry can shadow another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOutputs {
    /// Build project name by stage.
    pub project_names: IndexMap<String, String>,
    /// Registry URI by image repository.
    pub repository_uris: IndexMap<String, String>,
    /// Bucket holding stage outputs.
    pub artifact_bucket: String,
}

/// The full provisioning manifest of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineManifest {
    /// Manifest format version.
    pub version: u32,
    /// Pipeline name.
    pub pipeline: String,
    /// Bucket holding stage outputs.
    pub artifact_bucket: String,
    /// Image repositories in declaration order.
    pub repositories: Vec<CompiledRepository>,
    /// Stages in declaration order.
    pub stages: Vec<ManifestStage>,
    /// Stage names in dependency order.
    pub execution_order: Vec<String>,
    /// Values exported to operators.
    pub outputs: ManifestOutputs,
}

impl PipelineManifest {
    /// Builds the manifest of a compiled pipeline.
    #[must_use]
    pub fn from_compiled(pipeline: &CompiledPipeline) -> Self {
        let stages: Vec<ManifestStage> = pipeline
            .stages
            .iter()
            .map(|stage| manifest_stage(&pipeline.name, stage))
            .collect();

        let outputs = ManifestOutputs {
            project_names: stages
                .iter()
                .map(|stage| (stage.name.clone(), stage.project_name.clone()))
                .collect(),
            repository_uris: pipeline
                .repositories
                .iter()
                .map(|repository| (repository.spec.name.clone(), repository.uri.clone()))
                .collect(),
            artifact_bucket: pipeline.artifact_bucket.clone(),
        };

        Self {
            version: MANIFEST_VERSION,
            pipeline: pipeline.name.clone(),
            artifact_bucket: pipeline.artifact_bucket.clone(),
            repositories: pipeline.repositories.clone(),
            stages,
            execution_order: pipeline.execution_order.clone(),
            outputs,
        }
    }

    /// Serialises the manifest as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_json(&self) -> Result<String, StagelineError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialises the manifest as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String, StagelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the hex SHA-256 digest of the compact JSON form.
    ///
    /// Unchanged pipelines always produce the same fingerprint.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn fingerprint(&self) -> Result<String, StagelineError> {
        let json = self.to_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

impl From<&CompiledPipeline> for PipelineManifest {
    fn from(pipeline: &CompiledPipeline) -> Self {
        Self::from_compiled(pipeline)
    }
}

impl CompiledPipeline {
    /// Builds the provisioning manifest of this pipeline.
    #[must_use]
    pub fn to_manifest(&self) -> PipelineManifest {
        PipelineManifest::from_compiled(self)
    }
}

fn manifest_stage(pipeline: &str, stage: &ResolvedStage) -> ManifestStage {
    let declared = &stage.stage;
    let source = match stage.source_address {
        Some(ref address) => format!("s3://{}", address.location()),
        None => match declared.source.as_repository() {
            Some(repository) => repository.to_string(),
            None => String::new(),
        },
    };

    ManifestStage {
        name: declared.name.clone(),
        project_name: format!("{pipeline}-{}", declared.name),
        image: declared.environment.image.clone(),
        compute: declared.environment.compute.to_string(),
        privileged: declared.environment.privileged,
        source,
        secondary_sources: declared
            .secondary_sources
            .iter()
            .map(|repo| (repo.identifier.clone().unwrap_or_default(), repo.to_string()))
            .collect(),
        outputs: stage
            .outputs
            .iter()
            .map(|(slot, address)| (slot.clone(), format!("s3://{}", address.location())))
            .collect(),
        environment: stage.environment.clone(),
        script: declared.script.clone(),
        role: declared.role.clone(),
        network: declared.network.clone(),
        upstream: stage.upstream.clone(),
        grants: stage
            .grants
            .iter()
            .map(|grant| ManifestGrant {
                resource: grant.resource.to_string(),
                permission: grant.permission.to_string(),
            })
            .collect(),
    }
}
