//! # entra-infra
//!
//! Declarative Azure resources for the API authentication scenario.
//!
//! Nothing here talks to Azure. [`Deployment::declare`] turns a small set of
//! [`InfraParams`] into the resource list an external orchestrator deploys:
//!
//! - a user-assigned managed identity
//! - a Log Analytics workspace
//! - a container registry, with `AcrPull` for the identity and optionally
//!   for a deploying principal
//! - a Container Apps environment logging to the workspace
//! - an API Management service with a system-assigned identity
//!
//! Resource names embed a [`resource_token`] derived from the scope,
//! location and environment name, so the same inputs always produce the same
//! names and two environments never collide.
//!
//! ## Example
//!
//! ```rust
//! use entra_infra::{Deployment, InfraParams};
//!
//! let params = InfraParams::new("dev", "eastus2", "/subscriptions/3f2a9c1e-5b7d-4e8f-a6c0-1d2e3f4a5b6c");
//! let deployment = Deployment::declare(&params).unwrap();
//! let template = deployment.to_arm_template();
//!
//! assert!(template["resources"].as_array().unwrap().len() >= 6);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod naming;
pub mod params;
pub mod template;

pub use error::InfraError;
pub use naming::{ResourceNames, resource_token};
pub use params::InfraParams;
pub use template::{Deployment, Output, Resource, ResourceKind};
