//! Typed shapes of the `az` JSON responses.
//!
//! Only the fields the workflow reads are declared; everything else in the
//! response is ignored. A missing or mistyped field is a [`SchemaError`],
//! never a silent default.

use std::collections::BTreeSet;

use entra_types::{
    AppId, ClientSecret, ObjectId, Registration, RoleAssignment, ServicePrincipal, SignInAudience,
    SubscriptionId, TenantId,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::directory::Account;
use crate::error::SchemaError;

/// Decode `stdout` of `command` as `T`.
pub fn decode<T: DeserializeOwned>(command: &str, stdout: &str) -> Result<T, SchemaError> {
    serde_json::from_str(stdout).map_err(|e| SchemaError::new(command, e.to_string()))
}

fn id<T, E: std::fmt::Display>(command: &str, parsed: Result<T, E>) -> Result<T, SchemaError> {
    parsed.map_err(|e| SchemaError::new(command, e.to_string()))
}

/// `az account show`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Subscription id.
    pub id: String,
    /// Tenant id.
    pub tenant_id: String,
    /// Signed-in identity.
    #[serde(default)]
    pub user: Option<AccountUser>,
}

/// The `user` object of `az account show`.
#[derive(Debug, Deserialize)]
pub struct AccountUser {
    /// User principal name or client id.
    pub name: String,
}

impl AccountResponse {
    /// Convert into an [`Account`].
    pub fn into_account(self, command: &str) -> Result<Account, SchemaError> {
        Ok(Account {
            tenant_id: id(command, TenantId::parse(&self.tenant_id))?,
            subscription_id: id(command, SubscriptionId::parse(&self.id))?,
            user: self.user.map(|u| u.name),
        })
    }
}

/// An application object from `az ad app list|show|create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    /// Application (client) id.
    pub app_id: String,
    /// Object id.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Sign-in audience wire value.
    pub sign_in_audience: String,
    /// Web platform settings; absent when never configured.
    #[serde(default)]
    pub web: Option<WebSection>,
}

/// The `web` object of an application.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSection {
    /// Web redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl ApplicationResponse {
    /// Convert into a [`Registration`].
    pub fn into_registration(self, command: &str) -> Result<Registration, SchemaError> {
        let redirect_uris: BTreeSet<String> = self
            .web
            .map(|web| web.redirect_uris.into_iter().collect())
            .unwrap_or_default();
        Ok(Registration {
            app_id: id(command, AppId::parse(&self.app_id))?,
            object_id: id(command, ObjectId::parse(&self.id))?,
            display_name: self.display_name,
            sign_in_audience: SignInAudience::from_wire(&self.sign_in_audience),
            redirect_uris,
        })
    }
}

/// A service principal from `az ad sp list|create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalResponse {
    /// Object id.
    pub id: String,
    /// Owning application id.
    pub app_id: String,
    /// Display name.
    pub display_name: String,
}

impl ServicePrincipalResponse {
    /// Convert into a [`ServicePrincipal`].
    pub fn into_service_principal(self, command: &str) -> Result<ServicePrincipal, SchemaError> {
        Ok(ServicePrincipal {
            object_id: id(command, ObjectId::parse(&self.id))?,
            app_id: id(command, AppId::parse(&self.app_id))?,
            display_name: self.display_name,
        })
    }
}

/// A role assignment from `az role assignment list|create`.
///
/// `create` reports only the role definition id, so the name is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentResponse {
    /// Resource id of the assignment.
    pub id: String,
    /// Principal object id.
    pub principal_id: String,
    /// Role definition name.
    #[serde(default)]
    pub role_definition_name: Option<String>,
    /// Scope.
    pub scope: String,
}

impl RoleAssignmentResponse {
    /// Convert into a [`RoleAssignment`], using `requested_role` when the
    /// response omits the role name.
    pub fn into_role_assignment(
        self,
        command: &str,
        requested_role: &str,
    ) -> Result<RoleAssignment, SchemaError> {
        Ok(RoleAssignment {
            id: self.id,
            principal_id: id(command, ObjectId::parse(&self.principal_id))?,
            role_name: self
                .role_definition_name
                .unwrap_or_else(|| requested_role.to_string()),
            scope: self.scope,
        })
    }
}

/// `az ad app credential reset --append`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    /// Application id.
    pub app_id: String,
    /// The new secret value.
    pub password: String,
}

impl std::fmt::Debug for CredentialResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResponse")
            .field("app_id", &self.app_id)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl CredentialResponse {
    /// Convert into a [`ClientSecret`].
    pub fn into_secret(self, command: &str) -> Result<ClientSecret, SchemaError> {
        let app_id = id(command, AppId::parse(&self.app_id))?;
        if self.password.is_empty() {
            return Err(SchemaError::new(command, "empty password in credential response"));
        }
        Ok(ClientSecret::new(app_id, self.password))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const APP: &str = r#"{
        "appId": "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9",
        "id": "11111111-2222-3333-4444-555555555555",
        "displayName": "MyAPIM-AuthApp",
        "signInAudience": "AzureADMultipleOrgs",
        "web": {
            "homePageUrl": null,
            "redirectUris": ["https://myapi.example.com/auth/callback"]
        },
        "tags": []
    }"#;

    #[test]
    fn test_application_decodes() {
        let app: ApplicationResponse = decode("az ad app show", APP).unwrap();
        let registration = app.into_registration("az ad app show").unwrap();
        assert_eq!(registration.display_name, "MyAPIM-AuthApp");
        assert_eq!(
            registration.sign_in_audience,
            SignInAudience::AzureAdMultipleOrgs
        );
        assert!(registration.has_redirect_uri("https://myapi.example.com/auth/callback"));
    }

    #[test]
    fn test_application_without_web_section() {
        let json = r#"{"appId":"0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9","id":"11111111-2222-3333-4444-555555555555","displayName":"x","signInAudience":"AzureADMyOrg"}"#;
        let app: ApplicationResponse = decode("az ad app show", json).unwrap();
        let registration = app.into_registration("az ad app show").unwrap();
        assert!(registration.redirect_uris.is_empty());
    }

    #[test]
    fn test_missing_field_is_schema_error() {
        let err = decode::<ApplicationResponse>("az ad app show", r#"{"id":"x"}"#).unwrap_err();
        assert_eq!(err.command, "az ad app show");
        assert!(err.message.contains("appId"));
    }

    #[test]
    fn test_bad_guid_is_schema_error() {
        let json = r#"{"appId":"nope","id":"11111111-2222-3333-4444-555555555555","displayName":"x","signInAudience":"AzureADMyOrg"}"#;
        let app: ApplicationResponse = decode("az ad app show", json).unwrap();
        assert!(app.into_registration("az ad app show").is_err());
    }

    #[test]
    fn test_role_assignment_falls_back_to_requested_role() {
        let json = r#"{
            "id": "/subscriptions/s/providers/Microsoft.Authorization/roleAssignments/r",
            "principalId": "11111111-2222-3333-4444-555555555555",
            "roleDefinitionId": "/subscriptions/s/providers/Microsoft.Authorization/roleDefinitions/acdd72a7",
            "scope": "/subscriptions/s"
        }"#;
        let response: RoleAssignmentResponse = decode("az role assignment create", json).unwrap();
        let assignment = response
            .into_role_assignment("az role assignment create", "Reader")
            .unwrap();
        assert_eq!(assignment.role_name, "Reader");
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let response: CredentialResponse = decode(
            "az ad app credential reset",
            r#"{"appId":"0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9","password":"hunter2~x","tenant":"t"}"#,
        )
        .unwrap();
        assert!(!format!("{response:?}").contains("hunter2"));
        let secret = response.into_secret("az ad app credential reset").unwrap();
        assert_eq!(secret.expose(), "hunter2~x");
    }
}
