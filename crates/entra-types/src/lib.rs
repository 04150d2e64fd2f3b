//! # entra-types
//!
//! Domain types shared by the Entra ID provisioning crates.
//!
//! Everything the provisioning workflow reads from or writes to the identity
//! provider is modelled here as a plain value type: identifiers, the sign-in
//! audience enumeration, registrations and their derived resources, and the
//! write-once client secret.
//!
//! ## Identifier Formats
//!
//! | Type | Format |
//! |------|--------|
//! | [`AppId`] | canonical GUID (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`) |
//! | [`ObjectId`] | canonical GUID |
//! | [`TenantId`] | canonical GUID |
//! | [`SubscriptionId`] | canonical GUID |
//!
//! Identifiers are normalized to lowercase on parse so that comparisons are
//! independent of how the provider happened to spell them.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod audience;
pub mod error;
pub mod ids;
pub mod registration;
pub mod secret;

pub use audience::{AudienceClass, SignInAudience};
pub use error::TypeError;
pub use ids::{AppId, ObjectId, SubscriptionId, TenantId, is_canonical_guid};
pub use registration::{DesiredRegistration, Registration, RoleAssignment, ServicePrincipal};
pub use secret::ClientSecret;
