//! Template error types.

use thiserror::Error;

/// Errors produced while declaring or rendering a deployment.
#[derive(Debug, Error)]
pub enum InfraError {
    /// A parameter failed validation.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The template could not be serialized.
    #[error("template serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InfraError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
