//! Binary (benign / malware) stage

use crate::artifact::{ArtifactKind, ModelArtifact};
use crate::classifier::{BinaryClassifier, BinaryPrediction, Stage};
use crate::features::{FeatureVector, SchemaVersion};
use dgaguard_core::{ClassProbability, Error, Result};
use std::sync::Arc;

/// Default decision threshold on the malware probability
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Logistic benign/malware classifier backed by a shared artifact.
///
/// The artifact's second label is the malware class.
#[derive(Debug, Clone)]
pub struct BinaryStage {
    artifact: Arc<ModelArtifact>,
    threshold: f64,
}

impl BinaryStage {
    /// Wrap a binary artifact with the default threshold
    pub fn new(artifact: Arc<ModelArtifact>) -> Result<Self> {
        Self::with_threshold(artifact, DEFAULT_THRESHOLD)
    }

    /// Wrap a binary artifact; `threshold` must lie in [0, 1]
    pub fn with_threshold(artifact: Arc<ModelArtifact>, threshold: f64) -> Result<Self> {
        if artifact.kind() != ArtifactKind::Binary {
            return Err(Error::config(format!(
                "model '{}' is not a binary model",
                artifact.model_id()
            )));
        }

        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::config(format!(
                "threshold {} not in [0, 1]",
                threshold
            )));
        }

        Ok(Self {
            artifact,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }
}

impl Stage for BinaryStage {
    fn name(&self) -> &str {
        self.artifact.model_id()
    }

    fn schema_version(&self) -> SchemaVersion {
        self.artifact.schema_version()
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<ClassProbability>> {
        let probs = self.artifact.probabilities(features)?;
        Ok(self
            .artifact
            .labels()
            .iter()
            .zip(probs)
            .map(|(label, p)| ClassProbability::new(label.clone(), p))
            .collect())
    }
}

impl BinaryClassifier for BinaryStage {
    fn classify(&self, features: &FeatureVector) -> Result<BinaryPrediction> {
        let probs = self.artifact.probabilities(features)?;
        let malware = probs.get(1).copied().unwrap_or_default().clamp(0.0, 1.0);

        Ok(BinaryPrediction::from_probability(malware, self.threshold))
    }
}
