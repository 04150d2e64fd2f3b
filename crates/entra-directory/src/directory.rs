//! The directory seam.

use std::collections::BTreeSet;

use entra_types::{
    AppId, ClientSecret, DesiredRegistration, ObjectId, Registration, RoleAssignment,
    ServicePrincipal, SignInAudience, SubscriptionId, TenantId,
};
use serde::Serialize;

use crate::error::DirectoryError;

/// The signed-in CLI session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Home tenant of the session.
    pub tenant_id: TenantId,
    /// Active subscription.
    pub subscription_id: SubscriptionId,
    /// Signed-in user or principal name, if reported.
    pub user: Option<String>,
}

/// Access to registrations, service principals, role assignments and secrets.
///
/// Lookups return `Ok(None)` (or an empty list) for absent objects; only real
/// failures are errors. Implementations must not log secret values.
pub trait Directory {
    /// Resolve the current session's tenant and subscription.
    fn current_account(&self) -> Result<Account, DirectoryError>;

    /// Find the registration with exactly this display name.
    ///
    /// Fails with [`DirectoryError::DuplicateRegistrations`] when the name is
    /// ambiguous.
    fn find_registration(&self, display_name: &str) -> Result<Option<Registration>, DirectoryError>;

    /// Fetch a registration by application id.
    fn get_registration(&self, app_id: &AppId) -> Result<Option<Registration>, DirectoryError>;

    /// Create a registration in the desired state.
    fn create_registration(
        &self,
        desired: &DesiredRegistration,
    ) -> Result<Registration, DirectoryError>;

    /// Change the sign-in audience of an existing registration.
    fn update_audience(
        &self,
        object_id: &ObjectId,
        audience: &SignInAudience,
    ) -> Result<(), DirectoryError>;

    /// Replace the web redirect URIs of an existing registration.
    fn set_redirect_uris(
        &self,
        object_id: &ObjectId,
        uris: &BTreeSet<String>,
    ) -> Result<(), DirectoryError>;

    /// Find the service principal for an application.
    fn find_service_principal(
        &self,
        app_id: &AppId,
    ) -> Result<Option<ServicePrincipal>, DirectoryError>;

    /// Create the service principal for an application.
    fn create_service_principal(&self, app_id: &AppId) -> Result<ServicePrincipal, DirectoryError>;

    /// List assignments of `role` to `principal_id` at `scope`.
    fn find_role_assignments(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<Vec<RoleAssignment>, DirectoryError>;

    /// Assign `role` to `principal_id` at `scope`.
    fn create_role_assignment(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<RoleAssignment, DirectoryError>;

    /// Append a new client secret valid for `years` years.
    ///
    /// Existing secrets are left untouched.
    fn add_client_secret(
        &self,
        app_id: &AppId,
        display_name: &str,
        years: u8,
    ) -> Result<ClientSecret, DirectoryError>;
}

impl<D: Directory + ?Sized> Directory for &D {
    fn current_account(&self) -> Result<Account, DirectoryError> {
        (**self).current_account()
    }

    fn find_registration(&self, display_name: &str) -> Result<Option<Registration>, DirectoryError> {
        (**self).find_registration(display_name)
    }

    fn get_registration(&self, app_id: &AppId) -> Result<Option<Registration>, DirectoryError> {
        (**self).get_registration(app_id)
    }

    fn create_registration(
        &self,
        desired: &DesiredRegistration,
    ) -> Result<Registration, DirectoryError> {
        (**self).create_registration(desired)
    }

    fn update_audience(
        &self,
        object_id: &ObjectId,
        audience: &SignInAudience,
    ) -> Result<(), DirectoryError> {
        (**self).update_audience(object_id, audience)
    }

    fn set_redirect_uris(
        &self,
        object_id: &ObjectId,
        uris: &BTreeSet<String>,
    ) -> Result<(), DirectoryError> {
        (**self).set_redirect_uris(object_id, uris)
    }

    fn find_service_principal(
        &self,
        app_id: &AppId,
    ) -> Result<Option<ServicePrincipal>, DirectoryError> {
        (**self).find_service_principal(app_id)
    }

    fn create_service_principal(&self, app_id: &AppId) -> Result<ServicePrincipal, DirectoryError> {
        (**self).create_service_principal(app_id)
    }

    fn find_role_assignments(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<Vec<RoleAssignment>, DirectoryError> {
        (**self).find_role_assignments(principal_id, role, scope)
    }

    fn create_role_assignment(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<RoleAssignment, DirectoryError> {
        (**self).create_role_assignment(principal_id, role, scope)
    }

    fn add_client_secret(
        &self,
        app_id: &AppId,
        display_name: &str,
        years: u8,
    ) -> Result<ClientSecret, DirectoryError> {
        (**self).add_client_secret(app_id, display_name, years)
    }
}
