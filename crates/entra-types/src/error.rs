//! Domain type error types.

use thiserror::Error;

/// Errors that can occur while constructing domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Identifier does not match the canonical GUID pattern.
    #[error("invalid {kind}: `{value}` is not a GUID of the form xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx")]
    InvalidId {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Sign-in audience is not one of the known values or aliases.
    #[error("unknown sign-in audience: {0}")]
    UnknownAudience(String),
}
