//! Error types for dgaguard

/// Result type alias using dgaguard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dgaguard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied something the pipeline refuses to classify
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Feature vector and model artifact disagree on the feature schema
    #[error("schema mismatch for model '{model}': expected {expected}, found {found}")]
    SchemaMismatch {
        model: String,
        expected: String,
        found: String,
    },

    /// A model artifact could not be loaded or failed validation
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new schema mismatch error
    pub fn schema_mismatch(
        model: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::SchemaMismatch {
            model: model.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Create a new model load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short, stable name of the error kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::ModelLoad(_) => "model_load",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Whether the error rejects a single request rather than the whole process
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::SchemaMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_message() {
        let err = Error::schema_mismatch("family-v1", "v2", "v1");
        assert_eq!(
            err.to_string(),
            "schema mismatch for model 'family-v1': expected v2, found v1"
        );
        assert_eq!(err.kind(), "schema_mismatch");
        assert!(err.is_request_error());
    }

    #[test]
    fn test_load_errors_are_not_request_errors() {
        assert!(!Error::model_load("bad header").is_request_error());
        assert!(!Error::config("bad threshold").is_request_error());
        assert!(Error::invalid_input("empty").is_request_error());
    }
}
