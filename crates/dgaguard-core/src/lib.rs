//! dgaguard Core
//!
//! Types and error handling shared across dgaguard components.
//!
//! This crate provides:
//! - The validated [`DomainName`] input type
//! - Verdict types and their serializable report shape
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ClassProbability, DomainName, Prediction, Verdict, VerdictReport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ClassProbability, DomainName, Prediction, Verdict, VerdictReport};
}
