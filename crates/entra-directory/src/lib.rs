//! # entra-directory
//!
//! Read and write access to the identity provider's directory.
//!
//! The [`Directory`] trait is the only seam between the provisioning workflow
//! and the remote control plane. Production code talks to it through
//! [`AzCliDirectory`], which drives the `az` binary and decodes its JSON
//! output into [`entra_types`] values. Tests substitute an in-memory
//! implementation.
//!
//! ## Error Classification
//!
//! Every failure is mapped onto a [`DirectoryError`] variant so callers can
//! decide what to do without string matching:
//!
//! | Variant | Meaning | Retried by [`Retrying`] |
//! |---------|---------|-------------------------|
//! | `AuthenticationRequired` | no usable CLI session | no |
//! | `PermissionDenied` | caller lacks a directory or RBAC right | no |
//! | `Conflict` | object already exists | no |
//! | `NotFound` | object does not exist | no |
//! | `Transient` | throttling, timeouts, 5xx, replication lag | yes |
//! | `Schema` | unexpected response shape | no |
//!
//! ## Example
//!
//! ```rust,no_run
//! use entra_directory::{AzCliDirectory, Directory, RetryPolicy, Retrying, XshellRunner};
//!
//! # fn example() -> Result<(), entra_directory::DirectoryError> {
//! let directory = Retrying::new(AzCliDirectory::new(XshellRunner::new()?), RetryPolicy::default());
//! let account = directory.current_account()?;
//! println!("tenant {}", account.tenant_id);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod azcli;
pub mod directory;
pub mod error;
pub mod retry;
pub mod runner;
pub mod schema;

pub use azcli::{AzCliDirectory, classify_failure};
pub use directory::{Account, Directory};
pub use error::{DirectoryError, SchemaError};
pub use retry::{BackoffStrategy, RetryPolicy, Retrying};
pub use runner::{CommandOutput, CommandRunner, XshellRunner};
