//! Subcommand implementations, written against plain readers and writers

use crate::cli::ClassifyArgs;
use anyhow::{Context, Result};
use dgaguard_classifiers::{
    extract, init_pipeline_from_config, load_artifact, DetectorConfig, RetryPolicy,
    SchemaVersion,
};
use serde_json::json;
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Build the detector config from the config file plus command-line overrides
pub fn resolve_config(args: &ClassifyArgs) -> Result<DetectorConfig> {
    let mut config = DetectorConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    if let Some(path) = &args.binary_model {
        config.models.binary = path.clone();
    }
    if let Some(path) = &args.family_model {
        config.models.family = path.clone();
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }

    config.validate()?;
    Ok(config)
}

/// Classify every domain from `args`, or from `input` when none are given.
///
/// Verdicts go to `out` as one JSON object per line; per-domain failures go
/// to `err` as `{"error": ..}` objects. Returns the number of failures.
pub fn classify(
    args: &ClassifyArgs,
    input: impl BufRead,
    mut out: impl Write,
    mut err: impl Write,
) -> Result<usize> {
    let config = resolve_config(args)?;
    let (_registry, pipeline) =
        init_pipeline_from_config(&config).context("failed to initialize classifiers")?;

    let mut total = 0;
    let mut failures = 0;
    let mut classify_one = |domain: &str| -> Result<()> {
        total += 1;
        match pipeline.evaluate(domain) {
            Ok(verdict) => {
                serde_json::to_writer(&mut out, &verdict.report())?;
                writeln!(out)?;
            }
            Err(e) => {
                failures += 1;
                let record = json!({
                    "domain_name": domain,
                    "error": e.to_string(),
                    "kind": e.kind(),
                });
                writeln!(err, "{}", record)?;
            }
        }
        Ok(())
    };

    if args.domains.is_empty() {
        debug!("Reading domains from stdin");
        let mut input = input;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input
                .read_until(b'\n', &mut buf)
                .context("failed to read input")?
                == 0
            {
                break;
            }
            // Undecodable bytes still get a verdict
            let line = String::from_utf8_lossy(&buf);
            if !line.trim().is_empty() {
                classify_one(&line)?;
            }
        }
    } else {
        for domain in &args.domains {
            classify_one(domain)?;
        }
    }

    out.flush()?;

    info!("Classified {} domains ({} failed)", total, failures);
    Ok(failures)
}

/// Print an artifact's header fields as JSON
pub fn inspect(path: &std::path::Path, mut out: impl Write) -> Result<()> {
    let artifact = load_artifact(path, &RetryPolicy::default())?;

    let summary = json!({
        "model_id": artifact.model_id(),
        "kind": artifact.kind().to_string(),
        "schema_version": artifact.schema_version().as_u32(),
        "feature_count": artifact.schema_version().feature_count(),
        "labels": artifact.labels(),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}

/// Print named feature values for one domain
pub fn features(domain: &str, schema_version: u32, mut out: impl Write) -> Result<()> {
    let version = SchemaVersion::try_from(schema_version)?;
    let vector = extract(domain, version)?;

    for (name, value) in vector.named() {
        writeln!(out, "{:<24} {:.6}", name, value)?;
    }
    Ok(())
}
