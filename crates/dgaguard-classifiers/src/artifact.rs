//! Model artifacts: versioned, checksummed, immutable decision functions
//!
//! On-disk layout (format version 1):
//!
//! ```text
//! DGAGUARD-MODEL/1 sha256=<64 lowercase hex digits>\n
//! {"model_id": "...", "kind": "binary", "schema_version": 2, "labels": [...], "weights": [[...]], "biases": [...]}
//! ```
//!
//! The checksum covers the JSON body bytes exactly as stored. Binary
//! artifacts carry one weight row and the vocabulary `[negative, positive]`;
//! multi-class artifacts carry one weight row and one bias per label.

use crate::features::{FeatureVector, SchemaVersion};
use dgaguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Leading token of every artifact header
pub const ARTIFACT_MAGIC: &str = "DGAGUARD-MODEL";

/// Artifact layout version this build reads and writes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Which cascade stage an artifact was trained for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Binary,
    Multiclass,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => f.write_str("binary"),
            Self::Multiclass => f.write_str("multiclass"),
        }
    }
}

/// Trained decision function over a feature vector
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionFunction {
    /// `σ(w·x + b)` is the probability of the second label
    Logistic { weights: Vec<f64>, bias: f64 },

    /// One linear score per label, normalized with softmax
    Softmax {
        weights: Vec<Vec<f64>>,
        biases: Vec<f64>,
    },
}

impl DecisionFunction {
    /// Probability per output, in label order
    fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        match self {
            Self::Logistic { weights, bias } => {
                let p = sigmoid(dot(weights, x) + bias);
                vec![1.0 - p, p]
            }
            Self::Softmax { weights, biases } => {
                let logits: Vec<f64> = weights
                    .iter()
                    .zip(biases)
                    .map(|(row, b)| dot(row, x) + b)
                    .collect();
                softmax(&logits)
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactBody {
    model_id: String,
    kind: ArtifactKind,
    schema_version: SchemaVersion,
    labels: Vec<String>,
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

/// Immutable trained model plus the label vocabulary it was trained against
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    model_id: String,
    kind: ArtifactKind,
    schema_version: SchemaVersion,
    labels: Vec<String>,
    decision: DecisionFunction,
}

impl ModelArtifact {
    /// Build a binary artifact; `labels` is `[negative, positive]`
    pub fn binary(
        model_id: impl Into<String>,
        schema_version: SchemaVersion,
        labels: [&str; 2],
        weights: Vec<f64>,
        bias: f64,
    ) -> Result<Self> {
        Self::from_body(ArtifactBody {
            model_id: model_id.into(),
            kind: ArtifactKind::Binary,
            schema_version,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            weights: vec![weights],
            biases: vec![bias],
        })
    }

    /// Build a multi-class artifact with one weight row and bias per label
    pub fn multiclass(
        model_id: impl Into<String>,
        schema_version: SchemaVersion,
        labels: Vec<String>,
        weights: Vec<Vec<f64>>,
        biases: Vec<f64>,
    ) -> Result<Self> {
        Self::from_body(ArtifactBody {
            model_id: model_id.into(),
            kind: ArtifactKind::Multiclass,
            schema_version,
            labels,
            weights,
            biases,
        })
    }

    /// Parse and verify an artifact file's contents
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let newline = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| Error::model_load("artifact header is missing"))?;

        let header = std::str::from_utf8(&bytes[..newline])
            .map_err(|_| Error::model_load("artifact header is not valid UTF-8"))?;
        let expected_digest = parse_header(header.trim_end_matches('\r'))?;

        let body = &bytes[newline + 1..];
        let actual_digest = sha256_hex(body);
        if actual_digest != expected_digest {
            return Err(Error::model_load(format!(
                "checksum mismatch: header says {}, body hashes to {}",
                expected_digest, actual_digest
            )));
        }

        let body: ArtifactBody = serde_json::from_slice(body)
            .map_err(|e| Error::model_load(format!("failed to parse artifact body: {}", e)))?;

        Self::from_body(body)
    }

    /// Serialize with header and checksum
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let (weights, biases) = match &self.decision {
            DecisionFunction::Logistic { weights, bias } => (vec![weights.clone()], vec![*bias]),
            DecisionFunction::Softmax { weights, biases } => (weights.clone(), biases.clone()),
        };

        let body = serde_json::to_vec(&ArtifactBody {
            model_id: self.model_id.clone(),
            kind: self.kind,
            schema_version: self.schema_version,
            labels: self.labels.clone(),
            weights,
            biases,
        })?;

        let mut bytes = format!(
            "{}/{} sha256={}\n",
            ARTIFACT_MAGIC,
            ARTIFACT_FORMAT_VERSION,
            sha256_hex(&body)
        )
        .into_bytes();
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn from_body(body: ArtifactBody) -> Result<Self> {
        let ArtifactBody {
            model_id,
            kind,
            schema_version,
            labels,
            weights,
            mut biases,
        } = body;

        if model_id.trim().is_empty() {
            return Err(Error::model_load("artifact has an empty model_id"));
        }

        if labels.is_empty() {
            return Err(Error::model_load(format!(
                "model '{}' has an empty label vocabulary",
                model_id
            )));
        }

        let unique: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
        if unique.len() != labels.len() {
            return Err(Error::model_load(format!(
                "model '{}' has duplicate labels",
                model_id
            )));
        }

        let expected_rows = match kind {
            ArtifactKind::Binary => {
                if labels.len() != 2 {
                    return Err(Error::model_load(format!(
                        "binary model '{}' needs exactly 2 labels, found {}",
                        model_id,
                        labels.len()
                    )));
                }
                1
            }
            ArtifactKind::Multiclass => labels.len(),
        };

        if weights.len() != expected_rows || biases.len() != expected_rows {
            return Err(Error::model_load(format!(
                "model '{}' expects {} weight rows and biases, found {} and {}",
                model_id,
                expected_rows,
                weights.len(),
                biases.len()
            )));
        }

        let feature_count = schema_version.feature_count();
        for (i, row) in weights.iter().enumerate() {
            if row.len() != feature_count {
                return Err(Error::model_load(format!(
                    "model '{}' row {} has {} weights, schema {} has {} features",
                    model_id,
                    i,
                    row.len(),
                    schema_version,
                    feature_count
                )));
            }
            if let Some(j) = row.iter().position(|w| !w.is_finite()) {
                return Err(Error::model_load(format!(
                    "model '{}' has a non-finite weight at row {}, column {}",
                    model_id, i, j
                )));
            }
        }
        if biases.iter().any(|b| !b.is_finite()) {
            return Err(Error::model_load(format!(
                "model '{}' has a non-finite bias",
                model_id
            )));
        }

        // Features lie in [0, 1], so |w|_1 + |b| bounds every logit
        for (i, (row, bias)) in weights.iter().zip(&biases).enumerate() {
            let bound = row.iter().map(|w| w.abs()).sum::<f64>() + bias.abs();
            if !bound.is_finite() {
                return Err(Error::model_load(format!(
                    "model '{}' row {} can produce a non-finite score",
                    model_id, i
                )));
            }
        }

        let decision = match kind {
            ArtifactKind::Binary => DecisionFunction::Logistic {
                weights: weights.into_iter().next().unwrap_or_default(),
                bias: biases.pop().unwrap_or_default(),
            },
            ArtifactKind::Multiclass => DecisionFunction::Softmax { weights, biases },
        };

        Ok(Self {
            model_id,
            kind,
            schema_version,
            labels,
            decision,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Feature schema the model was trained on
    pub fn schema_version(&self) -> SchemaVersion {
        self.schema_version
    }

    /// Label vocabulary in model output order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn decision_function(&self) -> &DecisionFunction {
        &self.decision
    }

    /// Probability for every label, in vocabulary order
    pub fn probabilities(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        if features.schema_version() != self.schema_version {
            return Err(Error::schema_mismatch(
                &self.model_id,
                self.schema_version,
                features.schema_version(),
            ));
        }

        let expected = self.schema_version.feature_count();
        if features.len() != expected {
            return Err(Error::schema_mismatch(
                &self.model_id,
                format!("{} features", expected),
                format!("{} features", features.len()),
            ));
        }

        Ok(self.decision.evaluate(features.values()))
    }
}

fn parse_header(header: &str) -> Result<String> {
    let mut parts = header.split(' ');
    let tag = parts.next().unwrap_or_default();
    let checksum = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err(Error::model_load("artifact header has trailing fields"));
    }

    let version = tag
        .strip_prefix(ARTIFACT_MAGIC)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| Error::model_load("not a dgaguard model artifact (bad magic)"))?;

    let version: u32 = version
        .parse()
        .map_err(|_| Error::model_load(format!("invalid artifact format version '{}'", version)))?;
    if version != ARTIFACT_FORMAT_VERSION {
        return Err(Error::model_load(format!(
            "unsupported artifact format version {} (supported: {})",
            version, ARTIFACT_FORMAT_VERSION
        )));
    }

    let digest = checksum
        .strip_prefix("sha256=")
        .ok_or_else(|| Error::model_load("artifact header has no sha256 checksum"))?;
    let well_formed = digest.len() == 64
        && digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return Err(Error::model_load("artifact checksum is not 64 lowercase hex digits"));
    }

    Ok(digest.to_string())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn dot(weights: &[f64], x: &[f64]) -> f64 {
    weights.iter().zip(x).map(|(w, v)| w * v).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
