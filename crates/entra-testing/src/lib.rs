//! # entra-testing
//!
//! Test infrastructure for the provisioning crates.
//!
//! This crate provides an in-memory [`Directory`](entra_directory::Directory)
//! so that convergence, provisioning and validation can be exercised without
//! an Azure tenant or the `az` binary.
//!
//! ## Features
//!
//! - Stateful in-memory directory with registrations, service principals,
//!   role assignments and secrets
//! - Call recording for asserting which operations a run performed
//! - Fault injection per operation, before or after the effect lands
//! - Fixtures for the standard test tenant and scenario
//!
//! ## Example
//!
//! ```rust
//! use entra_directory::Directory;
//! use entra_testing::{InMemoryDirectory, Operation, fixtures};
//!
//! let directory = InMemoryDirectory::new();
//! let created = directory
//!     .create_registration(&fixtures::scenario_desired())
//!     .unwrap();
//!
//! assert_eq!(directory.registrations_named("MyAPIM-AuthApp").len(), 1);
//! assert_eq!(directory.count(Operation::CreateRegistration), 1);
//! # let _ = created;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod memory;

pub use memory::{InMemoryDirectory, InMemoryDirectoryBuilder, Operation};
