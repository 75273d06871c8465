//! Artifact file loading with bounded startup retries

use crate::artifact::{ArtifactKind, ModelArtifact};
use dgaguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry behaviour for transient I/O failures while reading artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first failed read
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between attempts, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl RetryPolicy {
    /// Fail on the first error
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            retry_backoff_ms: 0,
        }
    }

    fn backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    50
}

/// Read, verify and validate one artifact file.
///
/// Only transient read errors are retried. A missing file, a permission
/// problem, or any integrity failure is reported immediately as
/// [`Error::ModelLoad`].
pub fn load_artifact(path: impl AsRef<Path>, retry: &RetryPolicy) -> Result<ModelArtifact> {
    let path = path.as_ref();
    let bytes = read_with_retry(path, retry)?;

    let artifact = ModelArtifact::from_bytes(&bytes)
        .map_err(|e| Error::model_load(format!("{}: {}", path.display(), strip_prefix(&e))))?;

    info!(
        "Loaded {} model '{}' ({} labels, schema {}) from {}",
        artifact.kind(),
        artifact.model_id(),
        artifact.labels().len(),
        artifact.schema_version(),
        path.display()
    );

    Ok(artifact)
}

/// Load an artifact and require it to be of the given kind
pub fn load_artifact_of_kind(
    path: impl AsRef<Path>,
    kind: ArtifactKind,
    retry: &RetryPolicy,
) -> Result<ModelArtifact> {
    let path = path.as_ref();
    let artifact = load_artifact(path, retry)?;

    if artifact.kind() != kind {
        return Err(Error::model_load(format!(
            "{}: expected a {} model, found {} model '{}'",
            path.display(),
            kind,
            artifact.kind(),
            artifact.model_id()
        )));
    }

    Ok(artifact)
}

fn read_with_retry(path: &Path, retry: &RetryPolicy) -> Result<Vec<u8>> {
    read_with(path, retry, |p| std::fs::read(p))
}

fn read_with(
    path: &Path,
    retry: &RetryPolicy,
    mut read: impl FnMut(&Path) -> std::io::Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let mut attempt = 0;
    loop {
        match read(path) {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                return Ok(bytes);
            }
            Err(e) if is_transient(e.kind()) && attempt < retry.max_retries => {
                attempt += 1;
                warn!(
                    "Transient error reading {} (attempt {}/{}): {}",
                    path.display(),
                    attempt,
                    retry.max_retries + 1,
                    e
                );
                std::thread::sleep(retry.backoff());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::model_load(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(Error::model_load(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        }
    }
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    )
}

/// Message of a load error without the "model load error:" prefix
fn strip_prefix(err: &Error) -> String {
    match err {
        Error::ModelLoad(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SchemaVersion;
    use tempfile::TempDir;

    fn binary_artifact() -> ModelArtifact {
        ModelArtifact::binary(
            "bin-test",
            SchemaVersion::V1,
            ["benign", "malware"],
            vec![0.1; SchemaVersion::V1.feature_count()],
            -1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.model");
        std::fs::write(&path, binary_artifact().to_bytes().unwrap()).unwrap();

        let loaded = load_artifact(&path, &RetryPolicy::none()).unwrap();
        assert_eq!(loaded, binary_artifact());
    }

    #[test]
    fn test_missing_file_is_model_load_error() {
        let dir = TempDir::new().unwrap();
        let err = load_artifact(dir.path().join("absent.model"), &RetryPolicy::default())
            .unwrap_err();

        assert!(matches!(err, Error::ModelLoad(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.model");
        std::fs::write(&path, binary_artifact().to_bytes().unwrap()).unwrap();

        let err = load_artifact_of_kind(&path, ArtifactKind::Multiclass, &RetryPolicy::none())
            .unwrap_err();
        assert!(err.to_string().contains("expected a multiclass model"));
    }

    #[test]
    fn test_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.model");
        std::fs::write(&path, b"garbage\n{}").unwrap();

        let err = load_artifact(&path, &RetryPolicy::none()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("model load error: "));
        assert!(msg.contains("garbage.model"));
        assert!(msg.contains("bad magic"));
    }

    /// Reader that fails with `kind` for the first `failures` calls
    fn flaky_read(
        failures: u32,
        kind: ErrorKind,
        calls: &std::cell::Cell<u32>,
    ) -> impl FnMut(&Path) -> std::io::Result<Vec<u8>> + '_ {
        move |_: &Path| {
            calls.set(calls.get() + 1);
            if calls.get() <= failures {
                Err(std::io::Error::new(kind, "simulated"))
            } else {
                Ok(b"payload".to_vec())
            }
        }
    }

    fn quick_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            retry_backoff_ms: 0,
        }
    }

    #[test]
    fn test_transient_errors_retried_until_success() {
        let path = Path::new("flaky.model");
        for failures in 0..=3 {
            let calls = std::cell::Cell::new(0);
            let bytes = read_with(
                path,
                &quick_retry(3),
                flaky_read(failures, ErrorKind::Interrupted, &calls),
            )
            .unwrap();

            assert_eq!(bytes, b"payload");
            assert_eq!(calls.get(), failures + 1);
        }
    }

    #[test]
    fn test_retries_are_bounded() {
        let calls = std::cell::Cell::new(0);
        let err = read_with(
            Path::new("flaky.model"),
            &quick_retry(3),
            flaky_read(4, ErrorKind::Interrupted, &calls),
        )
        .unwrap_err();

        assert!(matches!(err, Error::ModelLoad(_)));
        assert_eq!(calls.get(), 4);

        let calls = std::cell::Cell::new(0);
        assert!(read_with(
            Path::new("flaky.model"),
            &RetryPolicy::none(),
            flaky_read(1, ErrorKind::TimedOut, &calls),
        )
        .is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_permanent_errors_not_retried() {
        for kind in [ErrorKind::PermissionDenied, ErrorKind::NotFound] {
            let calls = std::cell::Cell::new(0);
            let err = read_with(
                Path::new("locked.model"),
                &quick_retry(3),
                flaky_read(10, kind, &calls),
            )
            .unwrap_err();

            assert!(matches!(err, Error::ModelLoad(_)));
            assert_eq!(calls.get(), 1);
        }
    }

    #[test]
    fn test_transient_kinds() {
        assert!(is_transient(ErrorKind::Interrupted));
        assert!(is_transient(ErrorKind::TimedOut));
        assert!(!is_transient(ErrorKind::NotFound));
        assert!(!is_transient(ErrorKind::PermissionDenied));
    }
}
