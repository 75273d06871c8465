//! End-to-end pipeline tests over artifacts written to disk

use dgaguard_classifiers::{
    init_pipeline_from_config, ClassificationPipeline, DetectorConfig, FamilyClassifier,
    ModelArtifact, ModelPaths, ModelRegistry, RetryPolicy, SchemaVersion,
};
use dgaguard_core::{Error, Prediction};
use proptest::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn weights(version: SchemaVersion, named: &[(&str, f64)]) -> Vec<f64> {
    version
        .feature_names()
        .iter()
        .map(|name| {
            named
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, w)| *w)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Flags digit-heavy, high-entropy labels, especially under dynamic DNS
fn dga_binary(version: SchemaVersion) -> ModelArtifact {
    ModelArtifact::binary(
        format!("dga-binary-{}", version),
        version,
        ["benign", "malware"],
        weights(
            version,
            &[
                ("digit_ratio", 10.0),
                ("entropy", 6.0),
                ("dynamic_dns_suffix", 2.0),
            ],
        ),
        -5.0,
    )
    .unwrap()
}

fn botnet_families(version: SchemaVersion) -> ModelArtifact {
    let n = version.feature_count();
    ModelArtifact::multiclass(
        format!("botnet-families-{}", version),
        version,
        vec![
            "BotnetA".into(),
            "BotnetB".into(),
            "BotnetC".into(),
            "BotnetD".into(),
        ],
        vec![
            weights(version, &[("digit_ratio", 1.0)]),
            vec![0.0; n],
            vec![0.0; n],
            vec![0.0; n],
        ],
        vec![2.0, 1.5, 1.0, 0.0],
    )
    .unwrap()
}

fn write_artifacts(
    dir: &Path,
    binary: &ModelArtifact,
    family: &ModelArtifact,
) -> ModelPaths {
    let paths = ModelPaths {
        binary: dir.join("binary.model"),
        family: dir.join("family.model"),
    };
    std::fs::write(&paths.binary, binary.to_bytes().unwrap()).unwrap();
    std::fs::write(&paths.family, family.to_bytes().unwrap()).unwrap();
    paths
}

fn config(models: ModelPaths, schema_version: SchemaVersion) -> DetectorConfig {
    DetectorConfig {
        models,
        schema_version,
        loader: RetryPolicy::none(),
        ..Default::default()
    }
}

fn in_memory_pipeline() -> ClassificationPipeline {
    let version = SchemaVersion::V2;
    ModelRegistry::from_artifacts(dga_binary(version), botnet_families(version))
        .unwrap()
        .build_pipeline(&DetectorConfig::default())
        .unwrap()
}

fn load_pipeline(dir: &TempDir) -> (ModelRegistry, ClassificationPipeline) {
    let version = SchemaVersion::V2;
    let models = write_artifacts(dir.path(), &dga_binary(version), &botnet_families(version));
    init_pipeline_from_config(&config(models, version)).unwrap()
}

#[test]
fn test_well_known_domain_is_benign() {
    let dir = TempDir::new().unwrap();
    let (_registry, pipeline) = load_pipeline(&dir);

    let verdict = pipeline.evaluate("google.com").unwrap();

    assert!(!verdict.is_malware);
    assert!(verdict.top_k_families.is_empty());

    let report = serde_json::to_value(verdict.report()).unwrap();
    assert_eq!(report["prediction"], "Benign");
    assert_eq!(report["top_3_predictions"], serde_json::json!([]));
}

#[test]
fn test_generated_domain_gets_three_families() {
    let dir = TempDir::new().unwrap();
    let (_registry, pipeline) = load_pipeline(&dir);

    let verdict = pipeline.evaluate("xk29fq7z.ddns.net").unwrap();

    assert!(verdict.is_malware);
    assert_eq!(verdict.prediction(), Prediction::Malware);
    assert!(verdict.malware_probability >= 0.5 && verdict.malware_probability <= 1.0);
    assert_eq!(verdict.top_k_families.len(), 3);
    assert_eq!(verdict.top_k_families[0].label, "BotnetA");
    assert!(verdict
        .top_k_families
        .windows(2)
        .all(|w| w[0].probability >= w[1].probability));

    let report = serde_json::to_value(verdict.report()).unwrap();
    assert_eq!(report["domain_name"], "xk29fq7z.ddns.net");
    assert_eq!(report["prediction"], "Malware");
    assert_eq!(report["top_3_predictions"].as_array().unwrap().len(), 3);
    assert_eq!(report["top_3_predictions"][0]["class"], "BotnetA");
}

#[test]
fn test_tied_families_from_artifact() {
    let version = SchemaVersion::V2;
    let n = version.feature_count();
    let tied = ModelArtifact::multiclass(
        "tied",
        version,
        vec!["Zeus".into(), "Other".into(), "Mirai".into()],
        vec![vec![0.0; n]; 3],
        vec![2f64.ln(), 0.0, 2f64.ln()],
    )
    .unwrap();

    let dir = TempDir::new().unwrap();
    let models = write_artifacts(dir.path(), &dga_binary(version), &tied);
    let (_registry, pipeline) = init_pipeline_from_config(&config(models, version)).unwrap();

    let verdict = pipeline.evaluate("xk29fq7z.ddns.net").unwrap();
    let families = &verdict.top_k_families;

    assert_eq!(families[0].label, "Mirai");
    assert_eq!(families[1].label, "Zeus");
    assert_eq!(families[2].label, "Other");
    assert_eq!(families[0].probability, families[1].probability);
    assert!((families[0].probability - 0.4).abs() < 1e-9);
}

#[test]
fn test_corrupted_header_fails_startup() {
    let dir = TempDir::new().unwrap();
    let version = SchemaVersion::V2;
    let models = write_artifacts(dir.path(), &dga_binary(version), &botnet_families(version));

    let mut bytes = std::fs::read(&models.binary).unwrap();
    bytes[..14].copy_from_slice(b"CORRUPTEDMODEL");
    std::fs::write(&models.binary, bytes).unwrap();

    let err = init_pipeline_from_config(&config(models, version)).unwrap_err();
    assert!(matches!(err, Error::ModelLoad(_)), "{:?}", err);
}

#[test]
fn test_truncated_body_fails_startup() {
    let dir = TempDir::new().unwrap();
    let version = SchemaVersion::V2;
    let models = write_artifacts(dir.path(), &dga_binary(version), &botnet_families(version));

    let bytes = std::fs::read(&models.family).unwrap();
    std::fs::write(&models.family, &bytes[..bytes.len() - 10]).unwrap();

    let err = ModelRegistry::from_config(&config(models, version)).unwrap_err();
    assert!(err.to_string().contains("checksum mismatch"));
}

#[test]
fn test_schema_drift_fails_evaluation() {
    let dir = TempDir::new().unwrap();
    let trained_on = SchemaVersion::V1;
    let models = write_artifacts(
        dir.path(),
        &dga_binary(trained_on),
        &botnet_families(trained_on),
    );

    let (_registry, pipeline) =
        init_pipeline_from_config(&config(models, SchemaVersion::V2)).unwrap();

    let err = pipeline.evaluate("xk29fq7z.ddns.net").unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }), "{:?}", err);
    assert!(err.is_request_error());
}

#[test]
fn test_full_distribution_and_saturation() {
    let dir = TempDir::new().unwrap();
    let (registry, pipeline) = load_pipeline(&dir);
    let family = registry.family_stage().unwrap();
    let features = pipeline
        .extractor()
        .extract(&dgaguard_core::DomainName::parse("xk29fq7z.ddns.net").unwrap());

    let all = family.distribution(&features).unwrap();
    let total: f64 = all.iter().map(|p| p.probability).sum();
    assert!((total - 1.0).abs() < 1e-6);

    let saturated = family.rank_families(&features, 50).unwrap();
    assert_eq!(saturated, all);
    assert_eq!(saturated.len(), 4);
}

#[test]
fn test_malformed_domains_are_classified() {
    let dir = TempDir::new().unwrap();
    let (_registry, pipeline) = load_pipeline(&dir);

    let long = "a9".repeat(5_000);
    for domain in ["..", "-.-", "%%%.###", "üñí.cødé", long.as_str(), "127.0.0.1"] {
        assert!(pipeline.evaluate(domain).is_ok(), "{:?}", domain);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_evaluate_is_deterministic_and_bounded(domain in "\\PC{1,80}") {
        prop_assume!(!domain.trim().is_empty());

        let pipeline = in_memory_pipeline();

        let first = pipeline.evaluate(&domain).unwrap();
        let second = pipeline.evaluate(&domain).unwrap();
        prop_assert_eq!(&first, &second);

        prop_assert!((0.0..=1.0).contains(&first.malware_probability));
        prop_assert_eq!(first.is_malware, !first.top_k_families.is_empty());
        for pair in first.top_k_families.windows(2) {
            prop_assert!(pair[0].probability >= pair[1].probability);
        }
        for family in &first.top_k_families {
            prop_assert!((0.0..=1.0).contains(&family.probability));
        }
    }

    #[test]
    fn prop_domain_shaped_inputs(domain in "[a-z0-9-]{1,30}(\\.[a-z0-9-]{1,20}){0,3}") {
        let pipeline = in_memory_pipeline();

        let verdict = pipeline.evaluate(&domain).unwrap();
        let upper = pipeline.evaluate(&domain.to_uppercase()).unwrap();
        prop_assert_eq!(verdict.is_malware, upper.is_malware);
        prop_assert_eq!(verdict.malware_probability, upper.malware_probability);
    }
}
