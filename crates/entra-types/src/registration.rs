//! Registration, service principal and role assignment records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::audience::SignInAudience;
use crate::ids::{AppId, ObjectId};

/// An application registration as observed in the directory.
///
/// Client secrets are write-once and never part of the observed model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Application (client) id.
    pub app_id: AppId,
    /// Directory object id of the registration.
    pub object_id: ObjectId,
    /// Display name, unique within the queried scope.
    pub display_name: String,
    /// Which accounts may sign in.
    pub sign_in_audience: SignInAudience,
    /// Web redirect URIs, ordered for stable output.
    #[serde(default)]
    pub redirect_uris: BTreeSet<String>,
}

impl Registration {
    /// Whether the registration already lists `uri` as a web redirect URI.
    #[must_use]
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.contains(uri)
    }
}

/// The state a run converges to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRegistration {
    /// Display name used for lookup and creation.
    pub display_name: String,
    /// Web redirect URI.
    pub redirect_uri: String,
    /// Role granted to the service principal.
    pub role_name: String,
    /// Target sign-in audience.
    pub sign_in_audience: SignInAudience,
}

impl DesiredRegistration {
    /// Create a desired state targeting the multitenant audience and the
    /// `Reader` role.
    pub fn new(display_name: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            redirect_uri: redirect_uri.into(),
            role_name: "Reader".to_string(),
            sign_in_audience: SignInAudience::AzureAdMultipleOrgs,
        }
    }

    /// Set the role name.
    #[must_use]
    pub fn role_name(mut self, role: impl Into<String>) -> Self {
        self.role_name = role.into();
        self
    }

    /// Set the target audience.
    #[must_use]
    pub fn sign_in_audience(mut self, audience: SignInAudience) -> Self {
        self.sign_in_audience = audience;
        self
    }
}

/// The tenant-local identity of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipal {
    /// Object id of the principal (used for role assignments).
    pub object_id: ObjectId,
    /// Application id of the owning registration.
    pub app_id: AppId,
    /// Display name.
    pub display_name: String,
}

/// A role granted to a principal at a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Full resource id of the assignment.
    pub id: String,
    /// Object id of the principal holding the role.
    pub principal_id: ObjectId,
    /// Role definition name, e.g. `Reader`.
    pub role_name: String,
    /// Scope the role applies to.
    pub scope: String,
}

impl RoleAssignment {
    /// Whether this assignment is the `(principal, role, scope)` triple.
    ///
    /// Role names and scopes compare case-insensitively; a trailing `/` on
    /// the scope is ignored.
    #[must_use]
    pub fn matches(&self, principal_id: &ObjectId, role_name: &str, scope: &str) -> bool {
        &self.principal_id == principal_id
            && self.role_name.eq_ignore_ascii_case(role_name)
            && normalize_scope(&self.scope).eq_ignore_ascii_case(normalize_scope(scope))
    }
}

fn normalize_scope(scope: &str) -> &str {
    scope.trim().trim_end_matches('/')
}
