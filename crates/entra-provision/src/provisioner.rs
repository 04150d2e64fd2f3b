//! Service principal, role assignment and secret provisioning, and the
//! end-to-end run that ties them to registration convergence.

use std::fmt;

use entra_directory::{Account, Directory, DirectoryError};
use entra_types::{AppId, ClientSecret, ObjectId, Registration, RoleAssignment, ServicePrincipal};
use serde::Serialize;

use crate::config::Settings;
use crate::error::Error;
use crate::reconcile::{self, Plan};
use crate::session::Session;

/// Whether a step found the resource or created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Already present; left untouched.
    Existing,
    /// Created by this run.
    Created,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Existing => "existing",
            Self::Created => "created",
        })
    }
}

/// Everything a provisioning run did.
///
/// `Display` omits the secret; print it separately with
/// [`ClientSecret::expose`].
#[derive(Debug)]
pub struct ProvisionSummary {
    /// The session account.
    pub account: Account,
    /// The registration plan that was applied.
    pub plan: Plan,
    /// The converged registration.
    pub registration: Registration,
    /// The registration's service principal.
    pub service_principal: ServicePrincipal,
    /// Whether the principal was created.
    pub service_principal_outcome: Outcome,
    /// The role assignment.
    pub role_assignment: RoleAssignment,
    /// Whether the assignment was created.
    pub role_assignment_outcome: Outcome,
    /// The minted secret, if any.
    pub secret: Option<ClientSecret>,
}

impl fmt::Display for ProvisionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "App registration")?;
        writeln!(f, "  display name:      {}", self.registration.display_name)?;
        writeln!(f, "  application id:    {}", self.registration.app_id)?;
        writeln!(f, "  object id:         {}", self.registration.object_id)?;
        writeln!(f, "  tenant id:         {}", self.account.tenant_id)?;
        writeln!(f, "  sign-in audience:  {}", self.registration.sign_in_audience)?;
        for uri in &self.registration.redirect_uris {
            writeln!(f, "  redirect uri:      {uri}")?;
        }
        write!(f, "  plan:              {}", self.plan)?;
        writeln!(f, "Service principal")?;
        writeln!(
            f,
            "  object id:         {} ({})",
            self.service_principal.object_id, self.service_principal_outcome
        )?;
        writeln!(f, "Role assignment")?;
        writeln!(
            f,
            "  {} at {} ({})",
            self.role_assignment.role_name, self.role_assignment.scope, self.role_assignment_outcome
        )?;
        match &self.secret {
            Some(secret) => writeln!(
                f,
                "Client secret\n  minted (key id {})",
                secret.key_id().unwrap_or("unknown")
            ),
            None => writeln!(f, "Client secret\n  skipped"),
        }
    }
}

/// What a run would do, without doing it.
#[derive(Debug)]
pub struct PlanPreview {
    /// The session account.
    pub account: Account,
    /// The registration currently in the directory.
    pub observed: Option<Registration>,
    /// The computed plan.
    pub plan: Plan,
    /// The role assignment scope the run would use.
    pub scope: String,
}

impl fmt::Display for PlanPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Tenant {} / subscription {}",
            self.account.tenant_id, self.account.subscription_id
        )?;
        match &self.observed {
            Some(existing) => writeln!(
                f,
                "Found `{}` ({}), audience {}",
                existing.display_name, existing.app_id, existing.sign_in_audience
            )?,
            None => writeln!(f, "No existing registration")?,
        }
        write!(f, "Plan: {}", self.plan)?;
        writeln!(f, "Role scope: {}", self.scope)
    }
}

/// Provisions the resources around an app registration.
#[derive(Debug)]
pub struct Provisioner<D> {
    directory: D,
}

impl<D: Directory> Provisioner<D> {
    /// Create a provisioner over `directory`.
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Borrow the directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Make sure `app_id` has a service principal.
    ///
    /// # Errors
    ///
    /// Directory failures other than a create/create race.
    pub fn ensure_service_principal(
        &self,
        app_id: &AppId,
    ) -> Result<(ServicePrincipal, Outcome), Error> {
        if let Some(existing) = self.directory.find_service_principal(app_id)? {
            tracing::info!(%app_id, object_id = %existing.object_id, "service principal already exists");
            return Ok((existing, Outcome::Existing));
        }

        match self.directory.create_service_principal(app_id) {
            Ok(created) => {
                tracing::info!(%app_id, object_id = %created.object_id, "created service principal");
                Ok((created, Outcome::Created))
            }
            Err(DirectoryError::Conflict(message)) => {
                tracing::debug!(%app_id, %message, "service principal created concurrently");
                self.directory
                    .find_service_principal(app_id)?
                    .map(|existing| (existing, Outcome::Existing))
                    .ok_or(Error::Conflict(message))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Grant `role` to `principal_id` at `scope`, once.
    ///
    /// # Errors
    ///
    /// Directory failures; a conflict is only surfaced when the assignment
    /// cannot be found afterwards.
    pub fn assign_role(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<(RoleAssignment, Outcome), Error> {
        let existing = self.directory.find_role_assignments(principal_id, role, scope)?;
        if let Some(assignment) = existing.into_iter().next() {
            tracing::info!(%principal_id, role, scope, "role assignment already exists");
            return Ok((assignment, Outcome::Existing));
        }

        match self.directory.create_role_assignment(principal_id, role, scope) {
            Ok(assignment) => {
                tracing::info!(%principal_id, role, scope, "created role assignment");
                Ok((assignment, Outcome::Created))
            }
            Err(DirectoryError::Conflict(message)) => {
                tracing::debug!(%principal_id, role, scope, %message, "role assignment created concurrently");
                self.directory
                    .find_role_assignments(principal_id, role, scope)?
                    .into_iter()
                    .next()
                    .map(|assignment| (assignment, Outcome::Existing))
                    .ok_or(Error::Conflict(message))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mint a new client secret. Existing secrets stay valid.
    ///
    /// The value is never logged.
    ///
    /// # Errors
    ///
    /// Directory failures.
    pub fn create_secret(
        &self,
        app_id: &AppId,
        display_name: &str,
        years: u8,
    ) -> Result<ClientSecret, Error> {
        let secret = self.directory.add_client_secret(app_id, display_name, years)?;
        tracing::info!(
            %app_id,
            display_name,
            years,
            key_id = secret.key_id().unwrap_or("unknown"),
            "created client secret"
        );
        Ok(secret)
    }

    /// Compute what [`Provisioner::provision`] would do.
    ///
    /// # Errors
    ///
    /// Authentication and lookup failures.
    pub fn preview(&self, settings: &Settings) -> Result<PlanPreview, Error> {
        let mut session = Session::open(&self.directory, "plan")?;
        check_tenant(settings, session.account())?;

        let desired = settings.desired();
        let observed = self.directory.find_registration(&desired.display_name)?;
        let plan = reconcile::plan(&desired, observed.as_ref(), settings.redirect_policy);
        let scope = settings.scope_for(&session.account().subscription_id);

        session.succeed();
        Ok(PlanPreview {
            account: session.account().clone(),
            observed,
            plan,
            scope,
        })
    }

    /// Run the full workflow: probe, converge the registration, ensure the
    /// service principal and role assignment, and optionally mint a secret.
    ///
    /// A failed run may leave partial state; running again converges from it.
    ///
    /// # Errors
    ///
    /// Any fatal condition; the failing step is logged.
    pub fn provision(&self, settings: &Settings) -> Result<ProvisionSummary, Error> {
        let mut session = Session::open(&self.directory, "provision")?;
        check_tenant(settings, session.account())?;

        let desired = settings.desired();
        let observed = self.directory.find_registration(&desired.display_name)?;
        let plan = reconcile::plan(&desired, observed.as_ref(), settings.redirect_policy);
        let summary = plan.to_string();
        tracing::info!(
            display_name = %desired.display_name,
            plan = summary.trim_end(),
            "computed plan"
        );

        let registration = reconcile::apply(&self.directory, &plan, observed.as_ref())?;

        let (service_principal, service_principal_outcome) =
            self.ensure_service_principal(&registration.app_id)?;

        let scope = settings.scope_for(&session.account().subscription_id);
        let (role_assignment, role_assignment_outcome) =
            self.assign_role(&service_principal.object_id, &settings.role_name, &scope)?;

        let secret = if settings.mint_secret {
            Some(self.create_secret(
                &registration.app_id,
                &settings.secret_name(),
                settings.secret_years,
            )?)
        } else {
            tracing::info!(app_id = %registration.app_id, "skipping client secret");
            None
        };

        session.succeed();
        Ok(ProvisionSummary {
            account: session.account().clone(),
            plan,
            registration,
            service_principal,
            service_principal_outcome,
            role_assignment,
            role_assignment_outcome,
            secret,
        })
    }
}

fn check_tenant(settings: &Settings, account: &Account) -> Result<(), Error> {
    match &settings.tenant_id {
        Some(expected) if expected != &account.tenant_id => Err(Error::Authentication(format!(
            "the CLI session is signed in to tenant {} but AZURE_TENANT_ID is {expected}; \
             use 'az login --tenant {expected}'",
            account.tenant_id
        ))),
        _ => Ok(()),
    }
}
