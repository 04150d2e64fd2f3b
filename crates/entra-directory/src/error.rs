//! Directory error types.

use thiserror::Error;

/// Errors returned by [`Directory`](crate::Directory) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The `az` binary could not be started.
    #[error("Azure CLI unavailable: {0}. Install it from https://aka.ms/azure-cli")]
    CliUnavailable(String),

    /// No usable CLI session.
    #[error("authentication required: {0}. Run 'az login' and try again")]
    AuthenticationRequired(String),

    /// The caller lacks a directory role or RBAC permission.
    ///
    /// The message is the provider's, verbatim.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The object already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A failure that may succeed on retry.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// More than one registration carries the same display name.
    #[error(
        "{count} app registrations are named `{display_name}`; remove the duplicates or choose another name"
    )]
    DuplicateRegistrations {
        /// The ambiguous display name.
        display_name: String,
        /// How many registrations matched.
        count: usize,
    },

    /// The provider answered with an unexpected shape.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Any other command failure.
    #[error("`{command}` failed (exit status {status}): {stderr}")]
    CommandFailed {
        /// The command line, without secrets.
        command: String,
        /// Exit status, or -1 if the process was killed by a signal.
        status: i32,
        /// Trimmed stderr.
        stderr: String,
    },
}

impl DirectoryError {
    /// Check if this error is transient and may succeed on retry.
    ///
    /// Transient errors include throttling, timeouts, connection failures,
    /// 5xx responses and directory replication lag.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Check if this error means the object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error means the object already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A provider response that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected response from `{command}`: {message}")]
pub struct SchemaError {
    /// The command whose output failed to decode.
    pub command: String,
    /// What was wrong with it.
    pub message: String,
}

impl SchemaError {
    /// Create a schema error.
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}
