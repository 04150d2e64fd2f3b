//! Provisioning error types.

use entra_directory::{DirectoryError, SchemaError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can end a provisioning or validation run.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings are missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// No usable CLI session, or the wrong tenant.
    #[error("authentication required: {0}. Run 'az login' and try again")]
    Authentication(String),

    /// A transient failure that outlasted the retry budget.
    #[error("provider unavailable after retries: {0}")]
    TransientProvider(String),

    /// The caller lacks a required permission. Provider message verbatim.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Conflicting remote state that could not be resolved.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The provider answered with an unexpected shape.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A looked-up object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed command-line input.
    #[error("usage error: {0}")]
    Usage(String),

    /// Any other provider failure.
    #[error("provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Check if this error is transient and may succeed on a later run.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientProvider(_))
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Short category name used in structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Authentication(_) => "authentication",
            Self::TransientProvider(_) => "transient",
            Self::Permission(_) => "permission",
            Self::Conflict(_) => "conflict",
            Self::Schema(_) => "schema",
            Self::NotFound(_) => "not_found",
            Self::Usage(_) => "usage",
            Self::Provider(_) => "provider",
        }
    }
}

impl From<DirectoryError> for Error {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::AuthenticationRequired(message) => Self::Authentication(message),
            DirectoryError::PermissionDenied(message) => Self::Permission(message),
            DirectoryError::Transient(message) => Self::TransientProvider(message),
            DirectoryError::Conflict(message) => Self::Conflict(message),
            DirectoryError::NotFound(message) => Self::NotFound(message),
            DirectoryError::Schema(schema) => Self::Schema(schema),
            err @ DirectoryError::DuplicateRegistrations { .. } => Self::Conflict(err.to_string()),
            err @ (DirectoryError::CliUnavailable(_) | DirectoryError::CommandFailed { .. }) => {
                Self::Provider(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_mapping() {
        assert!(matches!(
            Error::from(DirectoryError::Transient("429".into())),
            Error::TransientProvider(_)
        ));
        assert!(Error::from(DirectoryError::Transient("429".into())).is_transient());
        assert!(matches!(
            Error::from(DirectoryError::AuthenticationRequired("expired".into())),
            Error::Authentication(_)
        ));
        assert!(matches!(
            Error::from(DirectoryError::DuplicateRegistrations {
                display_name: "x".into(),
                count: 2
            }),
            Error::Conflict(_)
        ));
    }

    #[test]
    fn test_permission_message_is_verbatim() {
        let err = Error::from(DirectoryError::PermissionDenied(
            "Insufficient privileges to complete the operation.".into(),
        ));
        assert_eq!(
            err.to_string(),
            "permission denied: Insufficient privileges to complete the operation."
        );
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.kind(), "permission");
    }
}
