//! # entra-provision
//!
//! Idempotent provisioning of Entra ID app registrations.
//!
//! A run reads [`Settings`], probes the directory for a registration with the
//! configured display name, converges it towards the desired state, then
//! makes sure its service principal and role assignment exist and optionally
//! mints a client secret. Every step is safe to repeat: a second run against
//! the state the first one produced changes nothing (except minting another
//! secret, which is always additive).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entra_directory::{AzCliDirectory, Retrying, XshellRunner};
//! use entra_provision::{Provisioner, Settings};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_file("app_registration.env")?;
//! let directory = Retrying::new(
//!     AzCliDirectory::new(XshellRunner::new()?),
//!     settings.retry.clone(),
//! );
//!
//! let summary = Provisioner::new(directory).provision(&settings)?;
//! println!("{summary}");
//! if let Some(secret) = &summary.secret {
//!     println!("client secret: {}", secret.expose());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | settings file parsing and validation |
//! | [`reconcile`] | registration convergence |
//! | [`provisioner`] | service principal, role assignment, secret, full run |
//! | [`validate`] | read-only validation report |
//! | [`session`] | authenticated run guard |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod provisioner;
pub mod reconcile;
pub mod session;
pub mod validate;

pub use config::{ConfigError, Settings, check_redirect_uri};
pub use error::Error;
pub use provisioner::{Outcome, PlanPreview, ProvisionSummary, Provisioner};
pub use reconcile::{Action, Plan, RedirectChange, RedirectPolicy, apply, plan, reconcile};
pub use session::Session;
pub use validate::{Check, CheckStatus, ValidationReport, validate};
