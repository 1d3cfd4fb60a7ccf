//! Error types for stageline.
//!
//! Every structural error is detected while resolving a pipeline graph,
//! before anything is provisioned. They are never retried: the caller has
//! to fix the declaration. Each one carries a [`ContractErrorInfo`] with a
//! stable code and a fix hint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error code for an artifact source that points at nothing earlier.
pub const CODE_DANGLING: &str = "PIPELINE-001-DANGLING";
/// Error code for two stages sharing a name.
pub const CODE_DUPLICATE_STAGE: &str = "PIPELINE-002-DUPLICATE_STAGE";
/// Error code for a reference to a slot its producer never declared.
pub const CODE_UNKNOWN_SLOT: &str = "PIPELINE-003-UNKNOWN_SLOT";
/// Error code for a cycle in explicit ordering edges.
pub const CODE_CYCLE: &str = "PIPELINE-004-CYCLE";
/// Error code for a slot declared twice on one stage.
pub const CODE_DUPLICATE_SLOT: &str = "PIPELINE-005-DUPLICATE_SLOT";
/// Error code for an ordering edge naming a stage that does not exist.
pub const CODE_UNKNOWN_STAGE: &str = "PIPELINE-006-UNKNOWN_STAGE";
/// Error code for a binding to an undeclared image repository.
pub const CODE_UNKNOWN_REPOSITORY: &str = "PIPELINE-007-UNKNOWN_REPOSITORY";
/// Error code for a stage, slot or repository name that breaks addressing.
pub const CODE_INVALID_NAME: &str = "PIPELINE-008-INVALID_NAME";
/// Error code for secondary sources without a unique identifier.
pub const CODE_SECONDARY_SOURCE: &str = "PIPELINE-009-SECONDARY_SOURCE";
/// Error code for an image repository declared twice.
pub const CODE_DUPLICATE_REPOSITORY: &str = "PIPELINE-010-DUPLICATE_REPOSITORY";

/// The main error type for stageline operations.
#[derive(Debug, Error)]
pub enum StagelineError {
    /// An artifact source names a slot not produced by an earlier stage.
    #[error("{0}")]
    DanglingReference(#[from] DanglingReferenceError),

    /// Two stages share a name.
    #[error("{0}")]
    DuplicateStageName(#[from] DuplicateStageNameError),

    /// A reference names a slot never declared on its producing stage.
    #[error("{0}")]
    UnknownSlot(#[from] UnknownSlotError),

    /// Explicit ordering edges form a cycle.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// Any other structural validation failure.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Invalid pipeline configuration.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Artifact store failure.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StagelineError {
    /// Returns the diagnostic payload for structural errors.
    #[must_use]
    pub fn error_info(&self) -> Option<ContractErrorInfo> {
        match self {
            Self::DanglingReference(e) => Some(e.error_info()),
            Self::DuplicateStageName(e) => Some(e.error_info()),
            Self::UnknownSlot(e) => Some(e.error_info()),
            Self::CycleDetected(e) => Some(e.error_info.clone()),
            Self::Validation(e) => e.error_info.clone(),
            _ => None,
        }
    }

    /// Returns the error code, if the error has one.
    #[must_use]
    pub fn code(&self) -> Option<String> {
        self.error_info().map(|info| info.code)
    }
}

impl From<serde_json::Error> for StagelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-001-DANGLING").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// A stage's artifact source names a slot that no earlier stage produces.
///
/// `slot` is the full reference (`producer/slot`), which is what the user
/// wrote and what shows up in diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Dangling reference: stage '{stage}' consumes '{slot}' which is not produced by an earlier stage")]
pub struct DanglingReferenceError {
    /// The consuming stage.
    pub stage: String,
    /// The referenced slot, as `producer/slot`.
    pub slot: String,
}

impl DanglingReferenceError {
    /// Creates a new dangling reference error.
    #[must_use]
    pub fn new(stage: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            slot: slot.into(),
        }
    }

    /// Returns the diagnostic payload.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(CODE_DANGLING, format!("'{}' is not available to '{}'", self.slot, self.stage))
            .with_fix_hint("Declare the producing stage before the stage that consumes its output.")
            .with_context_entry("stage", &self.stage)
            .with_context_entry("slot", &self.slot)
    }
}

/// Two stages in the same graph share a name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Duplicate stage name: '{name}' is declared more than once")]
pub struct DuplicateStageNameError {
    /// The duplicated name.
    pub name: String,
}

impl DuplicateStageNameError {
    /// Creates a new duplicate stage name error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the diagnostic payload.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(CODE_DUPLICATE_STAGE, format!("Stage '{}' is declared twice", self.name))
            .with_fix_hint("Stage names address artifacts and must be unique; rename one of them.")
            .with_context_entry("stage", &self.name)
    }
}

/// A reference names a slot its (earlier) producing stage never declared.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown slot: stage '{stage}' consumes slot '{slot}' which stage '{producer}' does not declare")]
pub struct UnknownSlotError {
    /// The consuming stage.
    pub stage: String,
    /// The producing stage.
    pub producer: String,
    /// The missing slot name.
    pub slot: String,
}

impl UnknownSlotError {
    /// Creates a new unknown slot error.
    #[must_use]
    pub fn new(stage: impl Into<String>, producer: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            producer: producer.into(),
            slot: slot.into(),
        }
    }

    /// Returns the diagnostic payload.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(
            CODE_UNKNOWN_SLOT,
            format!("Stage '{}' has no output slot '{}'", self.producer, self.slot),
        )
        .with_fix_hint("Check the slot name for typos or declare it on the producing stage.")
        .with_context_entry("stage", &self.stage)
        .with_context_entry("producer", &self.producer)
        .with_context_entry("slot", &self.slot)
    }
}

/// Error raised when a cycle is detected in explicit ordering edges.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            CODE_CYCLE,
            format!("Pipeline ordering contains a cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the ordering edges in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

/// Error raised for the remaining structural validation failures.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Errors raised while building or validating a [`crate::config::PipelineConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is absent or empty.
    #[error("Missing configuration value: {field}")]
    Missing {
        /// The field name.
        field: String,
    },

    /// A field has a value that cannot be used.
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// The field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("Could not parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Creates a missing field error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing { field: field.into() }
    }

    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by an [`crate::artifacts::ArtifactStore`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Nothing has been stored at the address.
    #[error("Artifact not found: {address}")]
    NotFound {
        /// The requested address.
        address: String,
    },

    /// The backing store failed.
    #[error("Artifact store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(address: impl Into<String>) -> Self {
        Self::NotFound { address: address.into() }
    }
}

/// Provides default suggestions for pipeline error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            CODE_DANGLING => Some(
                "Artifact sources may only consume outputs of stages declared earlier. \
                 Reorder the declarations or use the handle returned by add_stage.",
            ),
            CODE_DUPLICATE_STAGE => Some(
                "Every stage name doubles as an address prefix. Give each stage a distinct name.",
            ),
            CODE_UNKNOWN_SLOT => Some(
                "The producing stage exists but does not declare this output slot. \
                 Check for typos in the slot name.",
            ),
            CODE_CYCLE => Some(
                "Ordering edges must form a DAG. Drop the edge that closes the loop.",
            ),
            CODE_DUPLICATE_SLOT => Some("Declare each output slot once per stage."),
            CODE_UNKNOWN_STAGE => Some("Ordering edges must name stages that exist in the pipeline."),
            CODE_UNKNOWN_REPOSITORY => Some(
                "Declare the image repository on the graph before binding stages to it.",
            ),
            CODE_INVALID_NAME => Some("Names must be non-empty and may not contain '/' or whitespace."),
            CODE_SECONDARY_SOURCE => Some("Give every secondary source a unique identifier."),
            CODE_DUPLICATE_REPOSITORY => Some(
                "Declare each image repository once and reuse the handle returned by add_image_repository.",
            ),
            _ => None,
        }
    }
}
