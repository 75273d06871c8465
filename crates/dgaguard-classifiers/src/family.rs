//! Multi-class (malware family) stage and top-k ranking

use crate::artifact::{ArtifactKind, ModelArtifact};
use crate::classifier::{FamilyClassifier, Stage};
use crate::features::{FeatureVector, SchemaVersion};
use dgaguard_core::{ClassProbability, Error, Result};
use std::cmp::Ordering;
use std::sync::Arc;

/// Number of families reported for a malware verdict
pub const DEFAULT_TOP_K: usize = 3;

/// Softmax family classifier backed by a shared artifact
#[derive(Debug, Clone)]
pub struct MultiClassStage {
    artifact: Arc<ModelArtifact>,
}

impl MultiClassStage {
    pub fn new(artifact: Arc<ModelArtifact>) -> Result<Self> {
        if artifact.kind() != ArtifactKind::Multiclass {
            return Err(Error::config(format!(
                "model '{}' is not a multi-class model",
                artifact.model_id()
            )));
        }

        Ok(Self { artifact })
    }

    /// Size of the label vocabulary
    pub fn vocabulary_size(&self) -> usize {
        self.artifact.labels().len()
    }

    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    /// Full distribution over the vocabulary, ranked
    pub fn distribution(&self, features: &FeatureVector) -> Result<Vec<ClassProbability>> {
        self.rank_families(features, self.vocabulary_size())
    }
}

impl Stage for MultiClassStage {
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

impl FamilyClassifier for MultiClassStage {
    fn rank_families(&self, features: &FeatureVector, k: usize) -> Result<Vec<ClassProbability>> {
        let probs = self.predict_proba(features)?;
        top_k(probs, k)
    }
}

/// Rank a distribution and keep its `k` best entries.
///
/// Ordering is by probability, descending, with exact ties broken by
/// ascending label. A `k` larger than the distribution returns all of it.
pub fn top_k(mut probs: Vec<ClassProbability>, k: usize) -> Result<Vec<ClassProbability>> {
    if k == 0 {
        return Err(Error::invalid_input("k must be at least 1"));
    }

    probs.sort_by(compare_ranked);
    probs.truncate(k);
    Ok(probs)
}

fn compare_ranked(a: &ClassProbability, b: &ClassProbability) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then_with(|| a.label.cmp(&b.label))
}
