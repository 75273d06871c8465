//! Two-stage classification cascade
//!
//! The binary stage runs on every domain. The family stage only runs when the
//! binary stage flags the domain as malware, so benign traffic never pays for
//! the wider model.

use crate::binary::BinaryStage;
use crate::classifier::{BinaryClassifier, FamilyClassifier, Stage};
use crate::family::{MultiClassStage, DEFAULT_TOP_K};
use crate::features::FeatureExtractor;
use dgaguard_core::{DomainName, Error, Result, Verdict};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Cascade of a binary stage and a family stage sharing one feature extractor
#[derive(Debug)]
pub struct ClassificationPipeline<B = BinaryStage, F = MultiClassStage> {
    extractor: FeatureExtractor,
    binary: Arc<B>,
    family: Arc<F>,
    top_k: usize,
}

impl<B, F> Clone for ClassificationPipeline<B, F> {
    fn clone(&self) -> Self {
        Self {
            extractor: self.extractor,
            binary: Arc::clone(&self.binary),
            family: Arc::clone(&self.family),
            top_k: self.top_k,
        }
    }
}

impl<B, F> ClassificationPipeline<B, F>
where
    B: BinaryClassifier,
    F: FamilyClassifier,
{
    /// Create a pipeline reporting the top 3 families
    pub fn new(extractor: FeatureExtractor, binary: Arc<B>, family: Arc<F>) -> Self {
        for (stage, version) in [
            (binary.name(), binary.schema_version()),
            (family.name(), family.schema_version()),
        ] {
            if version != extractor.version() {
                warn!(
                    "Model '{}' expects feature schema {}, extractor produces {}; requests will fail",
                    stage,
                    version,
                    extractor.version()
                );
            }
        }

        Self {
            extractor,
            binary,
            family,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Change how many families a malware verdict carries
    pub fn with_top_k(mut self, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }
        self.top_k = top_k;
        Ok(self)
    }

    /// Classify one domain.
    ///
    /// Fails with [`Error::InvalidInput`] for empty input and
    /// [`Error::SchemaMismatch`] when a stage's model was trained on a
    /// different feature schema than the extractor produces. No partial
    /// verdict is returned on failure.
    pub fn evaluate(&self, domain: &str) -> Result<Verdict> {
        let start = Instant::now();
        let result = self.run(domain);

        match &result {
            Ok(verdict) => {
                metrics::counter!(
                    "dgaguard_verdicts_total",
                    "prediction" => verdict.prediction().as_str()
                )
                .increment(1);
            }
            Err(e) => {
                metrics::counter!("dgaguard_errors_total", "kind" => e.kind()).increment(1);
            }
        }
        metrics::histogram!("dgaguard_pipeline_latency_us")
            .record(start.elapsed().as_micros() as f64);

        result
    }

    fn run(&self, raw: &str) -> Result<Verdict> {
        let domain = DomainName::parse(raw)?;

        self.check_schema(self.binary.as_ref())?;
        let features = self.extractor.extract(&domain);

        let binary = self.binary.classify(&features)?;
        if !binary.is_malware() {
            debug!(
                "{} -> Benign (p_malware={:.4})",
                domain, binary.probability
            );
            return Ok(Verdict::benign(domain.as_str(), binary.probability));
        }

        self.check_schema(self.family.as_ref())?;
        metrics::counter!("dgaguard_family_stage_invocations_total").increment(1);
        let families = self.family.rank_families(&features, self.top_k)?;

        debug!(
            "{} -> Malware (p_malware={:.4}, top={:?})",
            domain,
            binary.probability,
            families.first().map(|f| f.label.as_str())
        );

        Ok(Verdict::malware(domain.as_str(), binary.probability, families))
    }

    fn check_schema(&self, stage: &dyn Stage) -> Result<()> {
        let expected = stage.schema_version();
        let found = self.extractor.version();
        if expected != found {
            error!(
                "Feature schema drift: model '{}' expects {}, extractor produces {}",
                stage.name(),
                expected,
                found
            );
            return Err(Error::schema_mismatch(stage.name(), expected, found));
        }
        Ok(())
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn binary_stage(&self) -> &Arc<B> {
        &self.binary
    }

    pub fn family_stage(&self) -> &Arc<F> {
        &self.family
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
