//! Error types for the fraud feature engine.

use thiserror::Error;

/// Result type alias using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while scoring a transaction.
///
/// Geo resolution failures are not errors: the resolver falls back to a
/// sentinel location and scoring carries on (see `FeatureBreakdown::geo_degraded`).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A required field is missing or malformed. Raised before any user
    /// state is read or mutated.
    #[error("Invalid transaction: {field} {reason}")]
    InvalidTransaction {
        /// Offending field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl EngineError {
    /// Build an `InvalidTransaction` error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidTransaction {
            field,
            reason: reason.into(),
        }
    }

    /// Field name that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            EngineError::InvalidTransaction { field, .. } => field,
        }
    }
}
