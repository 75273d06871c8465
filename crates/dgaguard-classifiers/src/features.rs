//! Lexical feature extraction for domain names
//!
//! Turns a domain string into a fixed-length vector of values in [0, 1].
//! Extraction is pure: no caches, no I/O, and all counting goes through
//! ordered collections so the floating point summation order never depends
//! on hashing.
//!
//! Two schema versions exist:
//! - V1: length, character-class ratios, entropy, runs, TLD and label structure
//! - V2: V1 followed by bigram/trigram statistics

use dgaguard_core::{DomainName, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Feature names for schema V1, in vector order
pub const FEATURE_NAMES_V1: [&str; 14] = [
    "length",
    "label_count",
    "longest_label",
    "digit_ratio",
    "vowel_ratio",
    "consonant_ratio",
    "hyphen_ratio",
    "special_ratio",
    "entropy",
    "longest_digit_run",
    "longest_consonant_run",
    "tld_category",
    "subdomain_depth",
    "dynamic_dns_suffix",
];

/// Feature names for schema V2, in vector order
pub const FEATURE_NAMES_V2: [&str; 18] = [
    "length",
    "label_count",
    "longest_label",
    "digit_ratio",
    "vowel_ratio",
    "consonant_ratio",
    "hyphen_ratio",
    "special_ratio",
    "entropy",
    "longest_digit_run",
    "longest_consonant_run",
    "tld_category",
    "subdomain_depth",
    "dynamic_dns_suffix",
    "distinct_bigram_ratio",
    "uncommon_bigram_ratio",
    "distinct_trigram_ratio",
    "char_class_transitions",
];

/// Longest legal DNS name, used to scale the length feature
const MAX_DOMAIN_LEN: f64 = 253.0;

/// Longest legal DNS label
const MAX_LABEL_LEN: f64 = 63.0;

/// Run lengths at or above this saturate to 1.0
const RUN_SATURATION: f64 = 8.0;

/// Entropy of a uniform draw over letters, digits and hyphen
const ENTROPY_SCALE: f64 = 5.209_453_365_628_95; // log2(37)

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];

const GENERIC_TLDS: &[&str] = &["com", "net", "org", "edu", "gov", "mil", "int"];

const DYNAMIC_DNS_SUFFIXES: &[&str] = &[
    "ddns.net",
    "duckdns.org",
    "dyndns.org",
    "dynu.net",
    "hopto.org",
    "myftp.biz",
    "no-ip.com",
    "no-ip.org",
    "serveftp.com",
    "sytes.net",
    "zapto.org",
];

/// Frequent English letter pairs; generated labels rarely stick to them.
const COMMON_BIGRAMS: &[[u8; 2]] = &[
    *b"th", *b"he", *b"in", *b"er", *b"an", *b"re", *b"on", *b"at", *b"en", *b"nd",
    *b"ti", *b"es", *b"or", *b"te", *b"of", *b"ed", *b"is", *b"it", *b"al", *b"ar",
    *b"st", *b"to", *b"nt", *b"ng", *b"se", *b"ha", *b"as", *b"ou", *b"io", *b"le",
    *b"ve", *b"co", *b"me", *b"de", *b"hi", *b"ri", *b"ro", *b"ic", *b"ne", *b"ea",
    *b"ra", *b"ce", *b"li", *b"ch", *b"ll", *b"be", *b"ma", *b"si", *b"om", *b"ur",
];

/// Version tag of the ordered feature set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    /// Version produced by default
    pub const CURRENT: SchemaVersion = SchemaVersion::V2;

    /// Number of features in vectors of this version
    pub fn feature_count(&self) -> usize {
        self.feature_names().len()
    }

    /// Feature names in vector order
    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Self::V1 => &FEATURE_NAMES_V1,
            Self::V2 => &FEATURE_NAMES_V2,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl TryFrom<u32> for SchemaVersion {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(Error::config(format!(
                "unsupported feature schema version {}",
                other
            ))),
        }
    }
}

impl From<SchemaVersion> for u32 {
    fn from(version: SchemaVersion) -> Self {
        version.as_u32()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u32())
    }
}

/// Fixed-length numeric description of one domain
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: SchemaVersion,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Schema version these values follow
    pub fn schema_version(&self) -> SchemaVersion {
        self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema
            .feature_names()
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// Pairs of (feature name, value) in vector order
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        self.schema
            .feature_names()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect()
    }
}

/// Coarse grouping of top-level domains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TldCategory {
    /// Long-established generic TLDs
    Generic,
    /// Two-letter country code TLDs
    CountryCode,
    /// Any other alphabetic TLD
    Uncommon,
    /// No TLD, or one that is not purely alphabetic (raw IPs, junk)
    Missing,
}

impl TldCategory {
    pub fn of(tld: &str) -> Self {
        if tld.is_empty() || !tld.chars().all(|c| c.is_ascii_lowercase()) {
            Self::Missing
        } else if GENERIC_TLDS.contains(&tld) {
            Self::Generic
        } else if tld.len() == 2 {
            Self::CountryCode
        } else {
            Self::Uncommon
        }
    }

    fn score(&self) -> f64 {
        match self {
            Self::Generic => 0.0,
            Self::CountryCode => 1.0 / 3.0,
            Self::Uncommon => 2.0 / 3.0,
            Self::Missing => 1.0,
        }
    }
}

/// Feature extractor pinned to one schema version
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor {
    version: SchemaVersion,
}

impl FeatureExtractor {
    pub fn new(version: SchemaVersion) -> Self {
        Self { version }
    }

    /// Schema version this extractor produces
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Extract features from an already validated domain
    pub fn extract(&self, domain: &DomainName) -> FeatureVector {
        extract_domain(domain, self.version)
    }
}

/// Validate a raw domain string and extract its features
pub fn extract(domain: &str, version: SchemaVersion) -> Result<FeatureVector> {
    let domain = DomainName::parse(domain)?;
    Ok(extract_domain(&domain, version))
}

/// Extract features from a validated domain
pub fn extract_domain(domain: &DomainName, version: SchemaVersion) -> FeatureVector {
    let normalized = domain.normalized();
    let parts = DomainParts::split(&normalized);

    let mut values = Vec::with_capacity(version.feature_count());
    lexical_features(&normalized, &parts, &mut values);

    if version >= SchemaVersion::V2 {
        ngram_features(&parts.body, &mut values);
    }

    debug_assert_eq!(values.len(), version.feature_count());

    FeatureVector {
        schema: version,
        values,
    }
}

struct DomainParts<'a> {
    labels: Vec<&'a str>,
    tld: &'a str,
    /// Characters of every label except the TLD, dots removed
    body: Vec<char>,
}

impl<'a> DomainParts<'a> {
    fn split(normalized: &'a str) -> Self {
        let labels: Vec<&str> = normalized.split('.').collect();
        let (tld, rest) = match labels.split_last() {
            Some((last, rest)) if !rest.is_empty() => (*last, rest),
            _ => ("", labels.as_slice()),
        };

        let mut body: Vec<char> = rest.iter().flat_map(|l| l.chars()).collect();
        if body.is_empty() {
            body = normalized.chars().filter(|c| *c != '.').collect();
        }

        Self { labels, tld, body }
    }
}

fn lexical_features(normalized: &str, parts: &DomainParts<'_>, out: &mut Vec<f64>) {
    let body = &parts.body;
    let len = normalized.chars().count() as f64;

    let longest_label = parts
        .labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0) as f64;

    let digits = body.iter().filter(|c| c.is_ascii_digit()).count();
    let vowels = body.iter().filter(|c| VOWELS.contains(c)).count();
    let consonants = body.iter().filter(|c| is_consonant(**c)).count();
    let hyphens = body.iter().filter(|c| **c == '-').count();
    let specials = body
        .iter()
        .filter(|c| !(c.is_ascii_alphanumeric() || **c == '-'))
        .count();

    out.push((len / MAX_DOMAIN_LEN).min(1.0));
    out.push((parts.labels.len() as f64 / 10.0).min(1.0));
    out.push((longest_label / MAX_LABEL_LEN).min(1.0));
    out.push(ratio(digits, body.len()));
    out.push(ratio(vowels, body.len()));
    out.push(ratio(consonants, body.len()));
    out.push(ratio(hyphens, body.len()));
    out.push(ratio(specials, body.len()));
    out.push((shannon_entropy(body) / ENTROPY_SCALE).min(1.0));
    out.push(saturate_run(longest_run(body, |c| c.is_ascii_digit())));
    out.push(saturate_run(longest_run(body, is_consonant)));
    out.push(TldCategory::of(parts.tld).score());
    out.push((parts.labels.len().saturating_sub(2) as f64 / 8.0).min(1.0));
    out.push(if has_dynamic_dns_suffix(normalized) { 1.0 } else { 0.0 });
}

fn ngram_features(body: &[char], out: &mut Vec<f64>) {
    let bigrams = body.len().saturating_sub(1);
    let trigrams = body.len().saturating_sub(2);

    let distinct_bigrams: BTreeSet<(char, char)> =
        body.windows(2).map(|w| (w[0], w[1])).collect();
    let uncommon_bigrams = body
        .windows(2)
        .filter(|w| !is_common_bigram(w[0], w[1]))
        .count();
    let distinct_trigrams: BTreeSet<(char, char, char)> =
        body.windows(3).map(|w| (w[0], w[1], w[2])).collect();
    let transitions = body
        .windows(2)
        .filter(|w| CharClass::of(w[0]) != CharClass::of(w[1]))
        .count();

    out.push(ratio(distinct_bigrams.len(), bigrams));
    out.push(ratio(uncommon_bigrams, bigrams));
    out.push(ratio(distinct_trigrams.len(), trigrams));
    out.push(ratio(transitions, bigrams));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Letter,
    Digit,
    Hyphen,
    Other,
}

impl CharClass {
    fn of(c: char) -> Self {
        if c.is_ascii_lowercase() {
            Self::Letter
        } else if c.is_ascii_digit() {
            Self::Digit
        } else if c == '-' {
            Self::Hyphen
        } else {
            Self::Other
        }
    }
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_lowercase() && !VOWELS.contains(&c)
}

fn is_common_bigram(a: char, b: char) -> bool {
    a.is_ascii() && b.is_ascii() && COMMON_BIGRAMS.contains(&[a as u8, b as u8])
}

fn has_dynamic_dns_suffix(normalized: &str) -> bool {
    DYNAMIC_DNS_SUFFIXES.iter().any(|suffix| {
        normalized == *suffix
            || normalized
                .strip_suffix(suffix)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn saturate_run(run: usize) -> f64 {
    (run as f64 / RUN_SATURATION).min(1.0)
}

fn longest_run(chars: &[char], pred: impl Fn(char) -> bool) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for &c in chars {
        if pred(c) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Shannon entropy in bits per character
fn shannon_entropy(chars: &[char]) -> f64 {
    if chars.is_empty() {
        return 0.0;
    }

    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for &c in chars {
        *counts.entry(c).or_insert(0) += 1;
    }

    let len = chars.len() as f64;
    counts.values().fold(0.0, |entropy, &count| {
        let p = count as f64 / len;
        entropy - p * p.log2()
    })
}
