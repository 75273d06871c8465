//! Core types for dgaguard

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate domain name as supplied by the caller.
///
/// The only invariant is that the string is non-empty after trimming
/// surrounding whitespace. Anything else, including characters that are not
/// legal in DNS and absurd lengths, is accepted: malformed names are common
/// among algorithmically generated domains and must still be classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainName {
    raw: String,
}

impl DomainName {
    /// Validate and wrap a raw domain string
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_input(
                "domain name is empty or whitespace-only",
            ));
        }

        Ok(Self {
            raw: trimmed.to_string(),
        })
    }

    /// The trimmed domain, with the caller's original casing
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lower-cased form with a single trailing root dot removed
    pub fn normalized(&self) -> String {
        let lower = self.raw.to_lowercase();
        match lower.strip_suffix('.') {
            Some(stripped) if !stripped.is_empty() => stripped.to_string(),
            _ => lower,
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Outcome of the binary stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prediction {
    Benign,
    Malware,
}

impl Prediction {
    /// Label used in reports and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benign => "Benign",
            Self::Malware => "Malware",
        }
    }

    pub fn is_malware(&self) -> bool {
        matches!(self, Self::Malware)
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single class label with its probability in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    /// Class (malware family) name
    #[serde(rename = "class")]
    pub label: String,

    /// Probability of this class
    pub probability: f64,
}

impl ClassProbability {
    pub fn new(label: impl Into<String>, probability: f64) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Final output of the classification pipeline for one domain
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Domain as submitted (trimmed)
    pub domain: String,

    /// Binary decision
    pub is_malware: bool,

    /// Probability assigned to the malware class by the binary stage
    pub malware_probability: f64,

    /// Most probable families, best first; empty when benign
    pub top_k_families: Vec<ClassProbability>,
}

impl Verdict {
    /// Verdict for a domain the binary stage let through
    pub fn benign(domain: impl Into<String>, malware_probability: f64) -> Self {
        Self {
            domain: domain.into(),
            is_malware: false,
            malware_probability,
            top_k_families: Vec::new(),
        }
    }

    /// Verdict for a domain flagged as malware, with its ranked families
    pub fn malware(
        domain: impl Into<String>,
        malware_probability: f64,
        top_k_families: Vec<ClassProbability>,
    ) -> Self {
        Self {
            domain: domain.into(),
            is_malware: true,
            malware_probability,
            top_k_families,
        }
    }

    pub fn prediction(&self) -> Prediction {
        if self.is_malware {
            Prediction::Malware
        } else {
            Prediction::Benign
        }
    }

    /// Serializable view in the shape presentation layers render
    pub fn report(&self) -> VerdictReport {
        VerdictReport::from(self)
    }
}

/// Wire shape of a verdict:
///
/// ```json
/// {"domain_name": "...", "prediction": "Malware", "top_3_predictions": [{"class": "...", "probability": 0.8}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictReport {
    pub domain_name: String,
    pub prediction: Prediction,
    pub top_3_predictions: Vec<ClassProbability>,
}

impl From<&Verdict> for VerdictReport {
    fn from(verdict: &Verdict) -> Self {
        Self {
            domain_name: verdict.domain.clone(),
            prediction: verdict.prediction(),
            top_3_predictions: verdict.top_k_families.clone(),
        }
    }
}
