//! Detector configuration

use crate::binary::DEFAULT_THRESHOLD;
use crate::family::DEFAULT_TOP_K;
use crate::features::SchemaVersion;
use crate::loader::RetryPolicy;
use dgaguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the classification pipeline and its models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Artifact locations
    #[serde(default)]
    pub models: ModelPaths,

    /// Feature schema the extractor produces
    #[serde(default)]
    pub schema_version: SchemaVersion,

    /// Malware probability at or above which a domain is flagged
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Number of families reported for a malware verdict
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Startup retry behaviour for artifact reads
    #[serde(default)]
    pub loader: RetryPolicy,
}

/// Paths of the two cascade artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPaths {
    /// Benign/malware model
    #[serde(default = "default_binary_path")]
    pub binary: PathBuf,

    /// Malware family model
    #[serde(default = "default_family_path")]
    pub family: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            binary: default_binary_path(),
            family: default_family_path(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            models: ModelPaths::default(),
            schema_version: SchemaVersion::default(),
            threshold: default_threshold(),
            top_k: default_top_k(),
            loader: RetryPolicy::default(),
        }
    }
}

impl DetectorConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("failed to parse detector config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Load from file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::config(format!(
                "threshold {} not in [0, 1]",
                self.threshold
            )));
        }

        if self.top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }

        Ok(())
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("./models/binary.model")
}

fn default_family_path() -> PathBuf {
    PathBuf::from("./models/family.model")
}
