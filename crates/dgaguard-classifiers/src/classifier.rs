//! Stage traits and common types

use crate::features::{FeatureVector, SchemaVersion};
use dgaguard_core::{ClassProbability, Prediction, Result};

/// Capability shared by every classification stage
pub trait Stage: Send + Sync {
    /// Identifier of the model behind this stage
    fn name(&self) -> &str;

    /// Feature schema the stage's model was trained on
    fn schema_version(&self) -> SchemaVersion;

    /// Probability for every label in the model's vocabulary, in vocabulary order
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<ClassProbability>>;
}

/// First stage of the cascade: benign or malware
pub trait BinaryClassifier: Stage {
    fn classify(&self, features: &FeatureVector) -> Result<BinaryPrediction>;
}

/// Second stage of the cascade: which malware family
pub trait FamilyClassifier: Stage {
    /// Up to `k` families, most probable first
    fn rank_families(&self, features: &FeatureVector, k: usize) -> Result<Vec<ClassProbability>>;
}

/// Result of the binary stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryPrediction {
    /// Decision after applying the threshold
    pub label: Prediction,

    /// Probability of the malware class (0.0-1.0)
    pub probability: f64,
}

impl BinaryPrediction {
    /// Apply a decision threshold to a malware probability
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        let label = if probability >= threshold {
            Prediction::Malware
        } else {
            Prediction::Benign
        };

        Self { label, probability }
    }

    pub fn is_malware(&self) -> bool {
        self.label.is_malware()
    }
}
