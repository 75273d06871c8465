//! dgaguard Classifiers
//!
//! Domain-name classification for DNS filtering and threat triage.
//!
//! The crate is organized as a cascade:
//! - Feature extraction: pure lexical statistics over the domain string
//! - Binary stage: logistic benign/malware decision with a configurable threshold
//! - Family stage: softmax ranking of malware families, run only for malware
//!
//! Models are versioned, checksummed artifacts loaded once into a
//! [`ModelRegistry`] and shared read-only across threads.

pub mod artifact;
pub mod binary;
pub mod classifier;
pub mod config;
pub mod family;
pub mod features;
pub mod loader;
pub mod pipeline;
pub mod registry;

pub use artifact::{ArtifactKind, DecisionFunction, ModelArtifact};
pub use binary::{BinaryStage, DEFAULT_THRESHOLD};
pub use classifier::{BinaryClassifier, BinaryPrediction, FamilyClassifier, Stage};
pub use config::{DetectorConfig, ModelPaths};
pub use family::{top_k, MultiClassStage, DEFAULT_TOP_K};
pub use features::{extract, FeatureExtractor, FeatureVector, SchemaVersion, TldCategory};
pub use loader::{load_artifact, load_artifact_of_kind, RetryPolicy};
pub use pipeline::ClassificationPipeline;
pub use registry::{init_pipeline_from_config, ModelRegistry};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{BinaryClassifier, BinaryPrediction, FamilyClassifier, Stage};
    pub use crate::config::DetectorConfig;
    pub use crate::features::{FeatureExtractor, FeatureVector, SchemaVersion};
    pub use crate::pipeline::ClassificationPipeline;
    pub use crate::registry::ModelRegistry;
    pub use dgaguard_core::prelude::*;
}
