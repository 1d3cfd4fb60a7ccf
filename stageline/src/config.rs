//! Pipeline configuration.
//!
//! Everything a pipeline declaration needs from its surroundings (account,
//! region, artifact bucket, registry host, free-form context values) lives
//! here and is validated once, instead of being read from the process
//! environment wherever it is needed.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variable holding the account id.
pub const ENV_ACCOUNT_ID: &str = "STAGELINE_ACCOUNT_ID";
/// Environment variable holding the region.
pub const ENV_REGION: &str = "STAGELINE_REGION";
/// Environment variable overriding the artifact bucket.
pub const ENV_ARTIFACT_BUCKET: &str = "STAGELINE_ARTIFACT_BUCKET";
/// Environment variable overriding the image registry host.
pub const ENV_REGISTRY_HOST: &str = "STAGELINE_REGISTRY_HOST";

/// Configuration shared by every stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Account that owns the provisioned resources.
    pub account_id: String,
    /// Region the resources live in.
    pub region: String,
    /// Bucket holding stage outputs.
    #[serde(default = "default_artifact_bucket")]
    pub artifact_bucket: String,
    /// Optional key prefix for every allocated artifact address.
    #[serde(default)]
    pub artifact_prefix: Option<String>,
    /// Host of the image registry. Derived from account and region when unset.
    #[serde(default)]
    pub registry_host: Option<String>,
    /// Free-form context values (repository owners, branches, ...).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

fn default_artifact_bucket() -> String {
    "pipeline-build-artifacts".to_string()
}

impl PipelineConfig {
    /// Creates a configuration with default bucket and no context.
    ///
    /// # Errors
    ///
    /// Returns an error if the account id or region is empty.
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            account_id: account_id.into(),
            region: region.into(),
            artifact_bucket: default_artifact_bucket(),
            artifact_prefix: None,
            registry_host: None,
            context: BTreeMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the artifact bucket.
    #[must_use]
    pub fn with_artifact_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.artifact_bucket = bucket.into();
        self
    }

    /// Sets the artifact key prefix.
    #[must_use]
    pub fn with_artifact_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.artifact_prefix = Some(prefix.into());
        self
    }

    /// Sets the registry host.
    #[must_use]
    pub fn with_registry_host(mut self, host: impl Into<String>) -> Self {
        self.registry_host = Some(host.into());
        self
    }

    /// Adds a context value.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from a variable lookup.
    ///
    /// Reads [`ENV_ACCOUNT_ID`] and [`ENV_REGION`] (required) and
    /// [`ENV_ARTIFACT_BUCKET`], [`ENV_REGISTRY_HOST`] (optional). Missing
    /// required values are an error rather than an empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::missing(key))
        };

        let mut config = Self::new(required(ENV_ACCOUNT_ID)?, required(ENV_REGION)?)?;
        if let Some(bucket) = lookup(ENV_ARTIFACT_BUCKET) {
            config.artifact_bucket = bucket;
        }
        config.registry_host = lookup(ENV_REGISTRY_HOST);
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first empty or unusable field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::missing("account_id"));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::missing("region"));
        }
        if self.artifact_bucket.trim().is_empty() {
            return Err(ConfigError::missing("artifact_bucket"));
        }
        if self.artifact_bucket.contains('/') {
            return Err(ConfigError::invalid("artifact_bucket", "bucket names cannot contain '/'"));
        }
        if let Some(ref prefix) = self.artifact_prefix {
            if prefix.trim_matches('/').is_empty() {
                return Err(ConfigError::invalid("artifact_prefix", "prefix cannot be empty"));
            }
        }
        if matches!(self.registry_host, Some(ref host) if host.trim().is_empty()) {
            return Err(ConfigError::invalid("registry_host", "host cannot be empty"));
        }
        Ok(())
    }

    /// Returns the image registry host.
    #[must_use]
    pub fn registry_host(&self) -> String {
        self.registry_host.clone().unwrap_or_else(|| {
            format!("{}.dkr.ecr.{}.amazonaws.com", self.account_id, self.region)
        })
    }

    /// Returns the URI of an image repository on the configured registry.
    #[must_use]
    pub fn repository_uri(&self, repository: &str) -> String {
        format!("{}/{repository}", self.registry_host())
    }

    /// Returns a context value, falling back to `default`.
    #[must_use]
    pub fn context_or(&self, key: &str, default: &str) -> String {
        self.context
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_new_rejects_empty_account() {
        assert_eq!(PipelineConfig::new("", "eu-west-1").unwrap_err(), ConfigError::missing("account_id"));
        assert_eq!(PipelineConfig::new("123", "  ").unwrap_err(), ConfigError::missing("region"));
    }

    #[test]
    fn test_builder_setters() {
        let config = PipelineConfig::new("123456789012", "eu-west-1")
            .unwrap()
            .with_artifact_bucket("ci-artifacts")
            .with_artifact_prefix("nightly")
            .with_context("branch_or_ref", "develop");

        assert_eq!(config.artifact_bucket, "ci-artifacts");
        assert_eq!(config.artifact_prefix.as_deref(), Some("nightly"));
        assert_eq!(config.context_or("branch_or_ref", "main"), "develop");
        assert_eq!(config.context_or("webgoat_owner", "WebGoat"), "WebGoat");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_registry_host_derived() {
        let config = PipelineConfig::new("123456789012", "eu-west-1").unwrap();
        assert_eq!(config.registry_host(), "123456789012.dkr.ecr.eu-west-1.amazonaws.com");

        let config = config.with_registry_host("registry.local:5000");
        assert_eq!(config.registry_host(), "registry.local:5000");
        assert_eq!(config.repository_uri("behave-image"), "registry.local:5000/behave-image");
    }

    #[test]
    fn test_from_env_with() {
        let vars: HashMap<&str, &str> = [
            (ENV_ACCOUNT_ID, "111122223333"),
            (ENV_REGION, "us-east-1"),
            (ENV_ARTIFACT_BUCKET, "my-bucket"),
        ]
        .into_iter()
        .collect();

        let config = PipelineConfig::from_env_with(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(config.account_id, "111122223333");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.artifact_bucket, "my-bucket");
        assert!(config.registry_host.is_none());
    }

    #[test]
    fn test_from_env_with_missing_region() {
        let err = PipelineConfig::from_env_with(|k| {
            (k == ENV_ACCOUNT_ID).then(|| "111122223333".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::missing(ENV_REGION));
    }

    #[test]
    fn test_from_json_str_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"account_id": "123", "region": "eu-central-1", "context": {"webgoat_owner": "me"}}"#,
        )
        .unwrap();

        assert_eq!(config.artifact_bucket, "pipeline-build-artifacts");
        assert_eq!(config.context_or("webgoat_owner", "WebGoat"), "me");
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(matches!(
            PipelineConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            PipelineConfig::from_json_str(r#"{"account_id": "123", "region": "r", "artifact_bucket": "a/b"}"#)
                .unwrap_err(),
            ConfigError::invalid("artifact_bucket", "bucket names cannot contain '/'")
        );
    }
}
