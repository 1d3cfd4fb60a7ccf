//! Deterministic artifact addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PipelineConfig;

/// A resolved storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    /// Bucket holding the object.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
}

impl Address {
    /// Creates an address.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Returns the object key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `bucket/key`.
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

/// Displays the key; the bucket is shared by the whole pipeline.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Allocates addresses for stage output slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressingScheme {
    bucket: String,
    prefix: Option<String>,
}

impl AddressingScheme {
    /// Creates a scheme writing into `bucket` with no key prefix.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
        }
    }

    /// Creates the scheme described by a pipeline configuration.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let scheme = Self::new(config.artifact_bucket.clone());
        match config.artifact_prefix {
            Some(ref prefix) => scheme.with_prefix(prefix.clone()),
            None => scheme,
        }
    }

    /// Sets a key prefix. Leading and trailing slashes are dropped.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        self.prefix = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Returns the bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Allocates the address of `slot` on `stage`.
    ///
    /// The key is `[prefix/]stage/slot`. Stage and slot names cannot contain
    /// `/`, so distinct `(stage, slot)` pairs never share a key.
    #[must_use]
    pub fn allocate(&self, stage: &str, slot: &str) -> Address {
        let key = match self.prefix {
            Some(ref prefix) => format!("{prefix}/{stage}/{slot}"),
            None => format!("{stage}/{slot}"),
        };
        Address::new(self.bucket.clone(), key)
    }
}
