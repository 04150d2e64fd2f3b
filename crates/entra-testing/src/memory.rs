//! In-memory directory.

use std::collections::{BTreeSet, HashMap, VecDeque};

use entra_directory::{Account, Directory, DirectoryError};
use entra_types::{
    AppId, ClientSecret, DesiredRegistration, ObjectId, Registration, RoleAssignment,
    ServicePrincipal, SignInAudience,
};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::fixtures;

/// Directory operations, for call recording and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Directory::current_account`].
    CurrentAccount,
    /// [`Directory::find_registration`].
    FindRegistration,
    /// [`Directory::get_registration`].
    GetRegistration,
    /// [`Directory::create_registration`].
    CreateRegistration,
    /// [`Directory::update_audience`].
    UpdateAudience,
    /// [`Directory::set_redirect_uris`].
    SetRedirectUris,
    /// [`Directory::find_service_principal`].
    FindServicePrincipal,
    /// [`Directory::create_service_principal`].
    CreateServicePrincipal,
    /// [`Directory::find_role_assignments`].
    FindRoleAssignments,
    /// [`Directory::create_role_assignment`].
    CreateRoleAssignment,
    /// [`Directory::add_client_secret`].
    AddClientSecret,
}

impl Operation {
    /// Whether the operation changes remote state.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::CreateRegistration
                | Self::UpdateAudience
                | Self::SetRedirectUris
                | Self::CreateServicePrincipal
                | Self::CreateRoleAssignment
                | Self::AddClientSecret
        )
    }
}

#[derive(Debug)]
struct Fault {
    error: DirectoryError,
    after_effect: bool,
}

#[derive(Debug, Clone)]
struct StoredSecret {
    display_name: String,
    value: String,
}

#[derive(Debug, Default)]
struct State {
    account: Option<Account>,
    registrations: Vec<Registration>,
    principals: Vec<ServicePrincipal>,
    assignments: Vec<RoleAssignment>,
    secrets: HashMap<AppId, Vec<StoredSecret>>,
    calls: Vec<Operation>,
    faults: HashMap<Operation, VecDeque<Fault>>,
}

/// A stateful fake of the remote directory.
///
/// Behaves like the provider where the workflow depends on it: display name
/// lookups fail on duplicates, creating an existing role assignment is a
/// [`DirectoryError::Conflict`], and secrets are appended.
#[derive(Debug)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// An empty directory signed in as [`fixtures::account`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a pre-populated directory.
    #[must_use]
    pub fn builder() -> InMemoryDirectoryBuilder {
        InMemoryDirectoryBuilder::new()
    }

    /// Make the next call to `operation` fail with `error` before it has any
    /// effect.
    pub fn fail_next(&self, operation: Operation, error: DirectoryError) {
        self.push_fault(operation, error, false);
    }

    /// Make the next call to `operation` apply its effect and then report
    /// `error`, as when a response is lost after the write landed.
    pub fn fail_next_after_effect(&self, operation: Operation, error: DirectoryError) {
        self.push_fault(operation, error, true);
    }

    fn push_fault(&self, operation: Operation, error: DirectoryError, after_effect: bool) {
        self.state
            .lock()
            .faults
            .entry(operation)
            .or_default()
            .push_back(Fault {
                error,
                after_effect,
            });
    }

    /// Every operation called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        self.state.lock().calls.clone()
    }

    /// How many times `operation` was called.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    /// How many state-changing calls were made.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|op| op.is_mutation())
            .count()
    }

    /// Forget recorded calls, keeping state.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// All registrations with this display name.
    #[must_use]
    pub fn registrations_named(&self, display_name: &str) -> Vec<Registration> {
        self.state
            .lock()
            .registrations
            .iter()
            .filter(|r| r.display_name == display_name)
            .cloned()
            .collect()
    }

    /// All stored role assignments.
    #[must_use]
    pub fn role_assignments(&self) -> Vec<RoleAssignment> {
        self.state.lock().assignments.clone()
    }

    /// All stored service principals.
    #[must_use]
    pub fn service_principals(&self) -> Vec<ServicePrincipal> {
        self.state.lock().principals.clone()
    }

    /// Number of secrets stored for `app_id`.
    #[must_use]
    pub fn secret_count(&self, app_id: &AppId) -> usize {
        self.state.lock().secrets.get(app_id).map_or(0, Vec::len)
    }

    /// Display names of the secrets stored for `app_id`.
    #[must_use]
    pub fn secret_names(&self, app_id: &AppId) -> Vec<String> {
        self.state
            .lock()
            .secrets
            .get(app_id)
            .map(|s| s.iter().map(|s| s.display_name.clone()).collect())
            .unwrap_or_default()
    }

    /// Values of the secrets stored for `app_id`, oldest first.
    ///
    /// Lets tests check that no minted value leaked into logs or output.
    #[must_use]
    pub fn secret_values(&self, app_id: &AppId) -> Vec<String> {
        self.state
            .lock()
            .secrets
            .get(app_id)
            .map(|s| s.iter().map(|s| s.value.clone()).collect())
            .unwrap_or_default()
    }

    /// Change a stored registration's audience behind the workflow's back.
    pub fn drift_audience(&self, app_id: &AppId, audience: SignInAudience) {
        let mut state = self.state.lock();
        if let Some(r) = state.registrations.iter_mut().find(|r| &r.app_id == app_id) {
            r.sign_in_audience = audience;
        }
    }

    /// Record the call, then run `effect` under the fault plan for `operation`.
    fn call<T>(
        &self,
        operation: Operation,
        effect: impl FnOnce(&mut State) -> Result<T, DirectoryError>,
    ) -> Result<T, DirectoryError> {
        let mut state = self.state.lock();
        state.calls.push(operation);
        tracing::trace!(?operation, "in-memory directory call");

        let fault = state
            .faults
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);

        match fault {
            None => effect(&mut *state),
            Some(Fault {
                error,
                after_effect: false,
            }) => Err(error),
            Some(Fault {
                error,
                after_effect: true,
            }) => {
                effect(&mut *state)?;
                Err(error)
            }
        }
    }
}

fn secret_value() -> String {
    format!("sec~{}", Uuid::new_v4().simple())
}

impl Directory for InMemoryDirectory {
    fn current_account(&self) -> Result<Account, DirectoryError> {
        self.call(Operation::CurrentAccount, |state| {
            state.account.clone().ok_or_else(|| {
                DirectoryError::AuthenticationRequired("Please run 'az login' to setup account.".into())
            })
        })
    }

    fn find_registration(&self, display_name: &str) -> Result<Option<Registration>, DirectoryError> {
        self.call(Operation::FindRegistration, |state| {
            let mut matching: Vec<&Registration> = state
                .registrations
                .iter()
                .filter(|r| r.display_name == display_name)
                .collect();
            if matching.len() > 1 {
                return Err(DirectoryError::DuplicateRegistrations {
                    display_name: display_name.to_string(),
                    count: matching.len(),
                });
            }
            Ok(matching.pop().cloned())
        })
    }

    fn get_registration(&self, app_id: &AppId) -> Result<Option<Registration>, DirectoryError> {
        self.call(Operation::GetRegistration, |state| {
            Ok(state
                .registrations
                .iter()
                .find(|r| &r.app_id == app_id)
                .cloned())
        })
    }

    fn create_registration(
        &self,
        desired: &DesiredRegistration,
    ) -> Result<Registration, DirectoryError> {
        self.call(Operation::CreateRegistration, |state| {
            let registration = Registration {
                app_id: AppId::from_uuid(Uuid::new_v4()),
                object_id: ObjectId::from_uuid(Uuid::new_v4()),
                display_name: desired.display_name.clone(),
                sign_in_audience: desired.sign_in_audience.clone(),
                redirect_uris: BTreeSet::from([desired.redirect_uri.clone()]),
            };
            state.registrations.push(registration.clone());
            Ok(registration)
        })
    }

    fn update_audience(
        &self,
        object_id: &ObjectId,
        audience: &SignInAudience,
    ) -> Result<(), DirectoryError> {
        self.call(Operation::UpdateAudience, |state| {
            let registration = state
                .registrations
                .iter_mut()
                .find(|r| &r.object_id == object_id)
                .ok_or_else(|| DirectoryError::NotFound(format!("Resource '{object_id}' does not exist")))?;
            registration.sign_in_audience = audience.clone();
            Ok(())
        })
    }

    fn set_redirect_uris(
        &self,
        object_id: &ObjectId,
        uris: &BTreeSet<String>,
    ) -> Result<(), DirectoryError> {
        self.call(Operation::SetRedirectUris, |state| {
            let registration = state
                .registrations
                .iter_mut()
                .find(|r| &r.object_id == object_id)
                .ok_or_else(|| DirectoryError::NotFound(format!("Resource '{object_id}' does not exist")))?;
            registration.redirect_uris = uris.clone();
            Ok(())
        })
    }

    fn find_service_principal(
        &self,
        app_id: &AppId,
    ) -> Result<Option<ServicePrincipal>, DirectoryError> {
        self.call(Operation::FindServicePrincipal, |state| {
            Ok(state.principals.iter().find(|p| &p.app_id == app_id).cloned())
        })
    }

    fn create_service_principal(&self, app_id: &AppId) -> Result<ServicePrincipal, DirectoryError> {
        self.call(Operation::CreateServicePrincipal, |state| {
            if state.principals.iter().any(|p| &p.app_id == app_id) {
                return Err(DirectoryError::Conflict(format!(
                    "A service principal for application '{app_id}' already exists"
                )));
            }
            let registration = state
                .registrations
                .iter()
                .find(|r| &r.app_id == app_id)
                .ok_or_else(|| DirectoryError::NotFound(format!("Application '{app_id}' does not exist")))?;
            let principal = ServicePrincipal {
                object_id: ObjectId::from_uuid(Uuid::new_v4()),
                app_id: app_id.clone(),
                display_name: registration.display_name.clone(),
            };
            state.principals.push(principal.clone());
            Ok(principal)
        })
    }

    fn find_role_assignments(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<Vec<RoleAssignment>, DirectoryError> {
        self.call(Operation::FindRoleAssignments, |state| {
            Ok(state
                .assignments
                .iter()
                .filter(|a| a.matches(principal_id, role, scope))
                .cloned()
                .collect())
        })
    }

    fn create_role_assignment(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<RoleAssignment, DirectoryError> {
        self.call(Operation::CreateRoleAssignment, |state| {
            if state
                .assignments
                .iter()
                .any(|a| a.matches(principal_id, role, scope))
            {
                return Err(DirectoryError::Conflict(
                    "(RoleAssignmentExists) The role assignment already exists.".into(),
                ));
            }
            let assignment = RoleAssignment {
                id: format!(
                    "{}/providers/Microsoft.Authorization/roleAssignments/{}",
                    scope.trim_end_matches('/'),
                    Uuid::new_v4()
                ),
                principal_id: principal_id.clone(),
                role_name: role.to_string(),
                scope: scope.to_string(),
            };
            state.assignments.push(assignment.clone());
            Ok(assignment)
        })
    }

    fn add_client_secret(
        &self,
        app_id: &AppId,
        display_name: &str,
        _years: u8,
    ) -> Result<ClientSecret, DirectoryError> {
        self.call(Operation::AddClientSecret, |state| {
            if !state.registrations.iter().any(|r| &r.app_id == app_id) {
                return Err(DirectoryError::NotFound(format!(
                    "Application '{app_id}' does not exist"
                )));
            }
            let value = secret_value();
            let key_id = Uuid::new_v4().to_string();
            state
                .secrets
                .entry(app_id.clone())
                .or_default()
                .push(StoredSecret {
                    display_name: display_name.to_string(),
                    value: value.clone(),
                });
            Ok(ClientSecret::new(app_id.clone(), value).with_key_id(key_id))
        })
    }
}

/// Builder for [`InMemoryDirectory`].
#[derive(Debug)]
pub struct InMemoryDirectoryBuilder {
    state: State,
}

impl InMemoryDirectoryBuilder {
    /// A builder signed in as [`fixtures::account`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State {
                account: Some(fixtures::account()),
                ..State::default()
            },
        }
    }

    /// Use a different signed-in account.
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.state.account = Some(account);
        self
    }

    /// Start without a CLI session.
    #[must_use]
    pub fn signed_out(mut self) -> Self {
        self.state.account = None;
        self
    }

    /// Seed a registration.
    #[must_use]
    pub fn with_registration(mut self, registration: Registration) -> Self {
        self.state.registrations.push(registration);
        self
    }

    /// Seed a service principal.
    #[must_use]
    pub fn with_service_principal(mut self, principal: ServicePrincipal) -> Self {
        self.state.principals.push(principal);
        self
    }

    /// Seed a role assignment.
    #[must_use]
    pub fn with_role_assignment(mut self, assignment: RoleAssignment) -> Self {
        self.state.assignments.push(assignment);
        self
    }

    /// Build the directory.
    #[must_use]
    pub fn build(self) -> InMemoryDirectory {
        InMemoryDirectory {
            state: Mutex::new(self.state),
        }
    }
}

impl Default for InMemoryDirectoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
