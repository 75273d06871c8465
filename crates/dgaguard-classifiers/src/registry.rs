//! Model registry: owns the two cascade artifacts for the process lifetime
//!
//! The registry is built once during startup. Both artifacts are read,
//! verified and validated before a registry value exists, so callers can only
//! ever observe a fully loaded pair. Stages and pipelines receive clones of
//! the registry's `Arc`s; nothing is mutated after load.

use crate::artifact::{ArtifactKind, ModelArtifact};
use crate::binary::BinaryStage;
use crate::config::DetectorConfig;
use crate::family::MultiClassStage;
use crate::features::FeatureExtractor;
use crate::loader::{load_artifact_of_kind, RetryPolicy};
use crate::pipeline::ClassificationPipeline;
use dgaguard_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry holding the binary and family artifacts
#[derive(Debug)]
pub struct ModelRegistry {
    binary: Arc<ModelArtifact>,
    family: Arc<ModelArtifact>,
}

impl ModelRegistry {
    /// Load both artifacts with the default retry policy
    pub fn load(binary_path: impl AsRef<Path>, family_path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_retry(binary_path, family_path, &RetryPolicy::default())
    }

    /// Load both artifacts, retrying transient read errors per `retry`
    pub fn load_with_retry(
        binary_path: impl AsRef<Path>,
        family_path: impl AsRef<Path>,
        retry: &RetryPolicy,
    ) -> Result<Self> {
        info!("Loading model registry");

        let binary = load_artifact_of_kind(binary_path, ArtifactKind::Binary, retry)?;
        let family = load_artifact_of_kind(family_path, ArtifactKind::Multiclass, retry)?;

        let registry = Self::from_artifacts(binary, family)?;
        info!(
            "Model registry ready: binary='{}', family='{}' ({} families)",
            registry.binary.model_id(),
            registry.family.model_id(),
            registry.family.labels().len()
        );

        Ok(registry)
    }

    /// Load the artifacts named in a detector configuration
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        Self::load_with_retry(&config.models.binary, &config.models.family, &config.loader)
    }

    /// Build a registry from artifacts already in memory
    pub fn from_artifacts(binary: ModelArtifact, family: ModelArtifact) -> Result<Self> {
        if binary.kind() != ArtifactKind::Binary {
            return Err(Error::model_load(format!(
                "model '{}' is not a binary model",
                binary.model_id()
            )));
        }
        if family.kind() != ArtifactKind::Multiclass {
            return Err(Error::model_load(format!(
                "model '{}' is not a multi-class model",
                family.model_id()
            )));
        }

        Ok(Self {
            binary: Arc::new(binary),
            family: Arc::new(family),
        })
    }

    /// Shared handle to the binary artifact
    pub fn binary_artifact(&self) -> Arc<ModelArtifact> {
        Arc::clone(&self.binary)
    }

    /// Shared handle to the family artifact
    pub fn family_artifact(&self) -> Arc<ModelArtifact> {
        Arc::clone(&self.family)
    }

    /// Binary stage over the shared artifact
    pub fn binary_stage(&self, threshold: f64) -> Result<BinaryStage> {
        BinaryStage::with_threshold(self.binary_artifact(), threshold)
    }

    /// Family stage over the shared artifact
    pub fn family_stage(&self) -> Result<MultiClassStage> {
        MultiClassStage::new(self.family_artifact())
    }

    /// Assemble the cascade described by `config` over this registry's artifacts
    pub fn build_pipeline(&self, config: &DetectorConfig) -> Result<ClassificationPipeline> {
        config.validate()?;

        ClassificationPipeline::new(
            FeatureExtractor::new(config.schema_version),
            Arc::new(self.binary_stage(config.threshold)?),
            Arc::new(self.family_stage()?),
        )
        .with_top_k(config.top_k)
    }
}

impl Drop for ModelRegistry {
    fn drop(&mut self) {
        debug!(
            "Releasing model registry ('{}', '{}')",
            self.binary.model_id(),
            self.family.model_id()
        );
    }
}

/// Load configuration, artifacts and pipeline in one step
pub fn init_pipeline_from_config(
    config: &DetectorConfig,
) -> Result<(ModelRegistry, ClassificationPipeline)> {
    let registry = ModelRegistry::from_config(config)?;
    let pipeline = registry.build_pipeline(config)?;
    Ok((registry, pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SchemaVersion;
    use tempfile::TempDir;

    fn artifacts(version: SchemaVersion) -> (ModelArtifact, ModelArtifact) {
        let n = version.feature_count();
        let binary =
            ModelArtifact::binary("bin", version, ["benign", "malware"], vec![0.0; n], -1.0)
                .unwrap();
        let family = ModelArtifact::multiclass(
            "fam",
            version,
            vec!["A".into(), "B".into()],
            vec![vec![0.0; n]; 2],
            vec![0.0, 0.0],
        )
        .unwrap();
        (binary, family)
    }

    #[test]
    fn test_load_registry_from_disk() {
        let dir = TempDir::new().unwrap();
        let (binary, family) = artifacts(SchemaVersion::V2);
        let binary_path = dir.path().join("binary.model");
        let family_path = dir.path().join("family.model");
        std::fs::write(&binary_path, binary.to_bytes().unwrap()).unwrap();
        std::fs::write(&family_path, family.to_bytes().unwrap()).unwrap();

        let registry = ModelRegistry::load(&binary_path, &family_path).unwrap();

        assert_eq!(registry.binary_artifact().model_id(), "bin");
        assert_eq!(registry.family_artifact().labels().len(), 2);
        assert!(Arc::ptr_eq(
            &registry.binary_artifact(),
            &registry.binary_artifact()
        ));
    }

    #[test]
    fn test_swapped_paths_rejected() {
        let dir = TempDir::new().unwrap();
        let (binary, family) = artifacts(SchemaVersion::V2);
        let binary_path = dir.path().join("binary.model");
        let family_path = dir.path().join("family.model");
        std::fs::write(&binary_path, binary.to_bytes().unwrap()).unwrap();
        std::fs::write(&family_path, family.to_bytes().unwrap()).unwrap();

        let err = ModelRegistry::load(&family_path, &binary_path).unwrap_err();
        assert!(matches!(err, Error::ModelLoad(_)));
    }

    #[test]
    fn test_from_artifacts_checks_kinds() {
        let (binary, family) = artifacts(SchemaVersion::V1);
        assert!(ModelRegistry::from_artifacts(family, binary).is_err());
    }

    #[test]
    fn test_build_pipeline_uses_config() {
        let (binary, family) = artifacts(SchemaVersion::V1);
        let registry = ModelRegistry::from_artifacts(binary, family).unwrap();
        let config = DetectorConfig {
            schema_version: SchemaVersion::V1,
            threshold: 0.9,
            top_k: 1,
            ..Default::default()
        };

        let pipeline = registry.build_pipeline(&config).unwrap();
        assert_eq!(pipeline.top_k(), 1);
        assert_eq!(pipeline.binary_stage().threshold(), 0.9);
        assert_eq!(pipeline.extractor().version(), SchemaVersion::V1);
    }

    #[test]
    fn test_pipeline_outlives_registry() {
        let (binary, family) = artifacts(SchemaVersion::V2);
        let pipeline = {
            let registry = ModelRegistry::from_artifacts(binary, family).unwrap();
            registry.build_pipeline(&DetectorConfig::default()).unwrap()
        };

        assert!(pipeline.evaluate("example.com").is_ok());
    }

    #[test]
    fn test_drop_releases_registry_handles() {
        let (binary, family) = artifacts(SchemaVersion::V2);
        let registry = ModelRegistry::from_artifacts(binary, family).unwrap();
        let pipeline = registry.build_pipeline(&DetectorConfig::default()).unwrap();

        let binary = registry.binary_artifact();
        let family = registry.family_artifact();
        // registry, stage and local handle
        assert_eq!(Arc::strong_count(&binary), 3);
        assert_eq!(Arc::strong_count(&family), 3);

        drop(registry);

        assert_eq!(Arc::strong_count(&binary), 2);
        assert_eq!(Arc::strong_count(&family), 2);
        assert!(pipeline.evaluate("example.com").is_ok());

        drop(pipeline);
        assert_eq!(Arc::strong_count(&binary), 1);
        assert_eq!(Arc::strong_count(&family), 1);
    }
}
