//! [`Directory`] backed by the Azure CLI.
//!
//! Every call spawns `az ... --output json` and decodes stdout with the
//! [`schema`](crate::schema) types. The CLI owns token acquisition and
//! refresh; this module never sees a bearer token.

use std::collections::BTreeSet;

use entra_types::{
    AppId, ClientSecret, DesiredRegistration, ObjectId, Registration, RoleAssignment,
    ServicePrincipal, SignInAudience,
};
use serde::de::DeserializeOwned;

use crate::directory::{Account, Directory};
use crate::error::DirectoryError;
use crate::runner::{CommandOutput, CommandRunner};
use crate::schema::{
    self, AccountResponse, ApplicationResponse, CredentialResponse, RoleAssignmentResponse,
    ServicePrincipalResponse,
};

const AZ: &str = "az";

const AUTH_MARKERS: &[&str] = &[
    "az login",
    "aadsts",
    "refresh token",
    "interactive authentication is needed",
    "no subscription found",
    "please run 'az account set'",
];

const PERMISSION_MARKERS: &[&str] = &[
    "authorizationfailed",
    "authorization_requestdenied",
    "insufficient privileges",
    "does not have authorization",
    "forbidden",
];

const CONFLICT_MARKERS: &[&str] = &["roleassignmentexists", "already exists", "conflict"];

const TRANSIENT_MARKERS: &[&str] = &[
    "principalnotfound",
    "timed out",
    "timeout",
    "connection reset",
    "connection refused",
    "connection aborted",
    "failed to establish a new connection",
    "max retries exceeded",
    "temporarily unavailable",
    "toomanyrequests",
    "too many requests",
    "internalservererror",
    "internal server error",
    "bad gateway",
    "serviceunavailable",
    "service unavailable",
    "gateway timeout",
];

// Numeric status markers need their context: bare digits also occur in ids.
const STATUS_MARKERS: &[&str] = &[
    "status code: 429",
    "status code 429",
    "(429)",
    "status code: 5",
    "status code 5",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "does not exist",
    "resourcenotfound",
    "request_resourcenotfound",
    "not found",
];

/// Classify a failed `az` invocation from its stderr.
///
/// Replication lag (`PrincipalNotFound`) is checked before the generic
/// not-found markers: a freshly created principal is reported as missing
/// for a while and the call succeeds on retry. HTTP status markers come
/// after not-found.
#[must_use]
pub fn classify_failure(command: &str, output: &CommandOutput) -> DirectoryError {
    let stderr = output.stderr.trim();
    let message = stderr
        .strip_prefix("ERROR:")
        .map_or(stderr, str::trim)
        .to_string();
    let lower = stderr.to_ascii_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(AUTH_MARKERS) {
        DirectoryError::AuthenticationRequired(message)
    } else if has(PERMISSION_MARKERS) {
        DirectoryError::PermissionDenied(message)
    } else if has(CONFLICT_MARKERS) {
        DirectoryError::Conflict(message)
    } else if has(TRANSIENT_MARKERS) {
        DirectoryError::Transient(message)
    } else if has(NOT_FOUND_MARKERS) {
        DirectoryError::NotFound(message)
    } else if has(STATUS_MARKERS) {
        DirectoryError::Transient(message)
    } else {
        DirectoryError::CommandFailed {
            command: command.to_string(),
            status: output.status.unwrap_or(-1),
            stderr: message,
        }
    }
}

/// Azure CLI directory backend.
#[derive(Debug)]
pub struct AzCliDirectory<R> {
    runner: R,
}

impl<R: CommandRunner> AzCliDirectory<R> {
    /// Create a backend that spawns `az` through `runner`.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Borrow the runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `az <args> --output json` and return stdout.
    ///
    /// The command line is logged at debug level; stdout is not, since some
    /// commands return credentials.
    fn az(&self, args: &[&str]) -> Result<(String, String), DirectoryError> {
        let mut argv: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        argv.push("--output".to_string());
        argv.push("json".to_string());

        let command = describe(args);
        tracing::debug!(command = %command, "running Azure CLI");

        let output = self.runner.run(AZ, &argv)?;
        if output.success() {
            Ok((command, output.stdout))
        } else {
            let err = classify_failure(&command, &output);
            tracing::debug!(command = %command, error = %err, "Azure CLI command failed");
            Err(err)
        }
    }

    fn az_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<(String, T), DirectoryError> {
        let (command, stdout) = self.az(args)?;
        let value = schema::decode(&command, &stdout)?;
        Ok((command, value))
    }

    /// Treat `NotFound` as absence.
    fn optional<T>(result: Result<T, DirectoryError>) -> Result<Option<T>, DirectoryError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(DirectoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// First three words of the command, e.g. `az ad app list`.
fn describe(args: &[&str]) -> String {
    let verbs: Vec<&str> = args
        .iter()
        .take_while(|a| !a.starts_with('-'))
        .copied()
        .collect();
    format!("{AZ} {}", verbs.join(" "))
}

impl<R: CommandRunner> Directory for AzCliDirectory<R> {
    fn current_account(&self) -> Result<Account, DirectoryError> {
        let (command, response): (_, AccountResponse) = self.az_json(&["account", "show"])?;
        Ok(response.into_account(&command)?)
    }

    fn find_registration(&self, display_name: &str) -> Result<Option<Registration>, DirectoryError> {
        let (command, apps): (_, Vec<ApplicationResponse>) =
            self.az_json(&["ad", "app", "list", "--display-name", display_name])?;

        // `--display-name` is a prefix filter.
        let mut matching: Vec<ApplicationResponse> = apps
            .into_iter()
            .filter(|app| app.display_name == display_name)
            .collect();

        if matching.len() > 1 {
            return Err(DirectoryError::DuplicateRegistrations {
                display_name: display_name.to_string(),
                count: matching.len(),
            });
        }
        matching
            .pop()
            .map(|app| app.into_registration(&command))
            .transpose()
            .map_err(DirectoryError::from)
    }

    fn get_registration(&self, app_id: &AppId) -> Result<Option<Registration>, DirectoryError> {
        let result = self.az_json::<ApplicationResponse>(&["ad", "app", "show", "--id", app_id.as_str()]);
        match Self::optional(result)? {
            Some((command, app)) => Ok(Some(app.into_registration(&command)?)),
            None => Ok(None),
        }
    }

    fn create_registration(
        &self,
        desired: &DesiredRegistration,
    ) -> Result<Registration, DirectoryError> {
        let (command, app): (_, ApplicationResponse) = self.az_json(&[
            "ad",
            "app",
            "create",
            "--display-name",
            &desired.display_name,
            "--sign-in-audience",
            desired.sign_in_audience.as_str(),
            "--web-redirect-uris",
            &desired.redirect_uri,
        ])?;
        Ok(app.into_registration(&command)?)
    }

    fn update_audience(
        &self,
        object_id: &ObjectId,
        audience: &SignInAudience,
    ) -> Result<(), DirectoryError> {
        self.az(&[
            "ad",
            "app",
            "update",
            "--id",
            object_id.as_str(),
            "--sign-in-audience",
            audience.as_str(),
        ])?;
        Ok(())
    }

    fn set_redirect_uris(
        &self,
        object_id: &ObjectId,
        uris: &BTreeSet<String>,
    ) -> Result<(), DirectoryError> {
        let mut args = vec!["ad", "app", "update", "--id", object_id.as_str()];
        if uris.is_empty() {
            args.extend(["--set", "web.redirectUris=[]"]);
        } else {
            args.push("--web-redirect-uris");
            args.extend(uris.iter().map(String::as_str));
        }
        self.az(&args)?;
        Ok(())
    }

    fn find_service_principal(
        &self,
        app_id: &AppId,
    ) -> Result<Option<ServicePrincipal>, DirectoryError> {
        let filter = format!("appId eq '{app_id}'");
        let (command, principals): (_, Vec<ServicePrincipalResponse>) =
            self.az_json(&["ad", "sp", "list", "--filter", &filter])?;
        principals
            .into_iter()
            .next()
            .map(|sp| sp.into_service_principal(&command))
            .transpose()
            .map_err(DirectoryError::from)
    }

    fn create_service_principal(&self, app_id: &AppId) -> Result<ServicePrincipal, DirectoryError> {
        let (command, sp): (_, ServicePrincipalResponse) =
            self.az_json(&["ad", "sp", "create", "--id", app_id.as_str()])?;
        Ok(sp.into_service_principal(&command)?)
    }

    fn find_role_assignments(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<Vec<RoleAssignment>, DirectoryError> {
        let (command, assignments): (_, Vec<RoleAssignmentResponse>) = self.az_json(&[
            "role",
            "assignment",
            "list",
            "--assignee",
            principal_id.as_str(),
            "--role",
            role,
            "--scope",
            scope,
        ])?;

        let mut found = Vec::with_capacity(assignments.len());
        for response in assignments {
            let assignment = response.into_role_assignment(&command, role)?;
            if assignment.matches(principal_id, role, scope) {
                found.push(assignment);
            }
        }
        Ok(found)
    }

    fn create_role_assignment(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<RoleAssignment, DirectoryError> {
        let (command, response): (_, RoleAssignmentResponse) = self.az_json(&[
            "role",
            "assignment",
            "create",
            "--assignee-object-id",
            principal_id.as_str(),
            "--assignee-principal-type",
            "ServicePrincipal",
            "--role",
            role,
            "--scope",
            scope,
        ])?;
        Ok(response.into_role_assignment(&command, role)?)
    }

    fn add_client_secret(
        &self,
        app_id: &AppId,
        display_name: &str,
        years: u8,
    ) -> Result<ClientSecret, DirectoryError> {
        let years = years.to_string();
        let (command, response): (_, CredentialResponse) = self.az_json(&[
            "ad",
            "app",
            "credential",
            "reset",
            "--id",
            app_id.as_str(),
            "--append",
            "--display-name",
            display_name,
            "--years",
            &years,
        ])?;
        Ok(response.into_secret(&command)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn failure(stderr: &str) -> DirectoryError {
        classify_failure("az ad app list", &CommandOutput::failed(1, stderr))
    }

    #[test]
    fn test_classify_login_required() {
        let err = failure("ERROR: Please run 'az login' to setup account.");
        assert_eq!(
            err,
            DirectoryError::AuthenticationRequired("Please run 'az login' to setup account.".into())
        );
        assert!(matches!(
            failure("ERROR: AADSTS700082: The refresh token has expired due to inactivity."),
            DirectoryError::AuthenticationRequired(_)
        ));
    }

    #[test]
    fn test_classify_permission_keeps_message() {
        let err = failure("ERROR: Insufficient privileges to complete the operation.");
        assert_eq!(
            err,
            DirectoryError::PermissionDenied("Insufficient privileges to complete the operation.".into())
        );
        assert!(matches!(
            failure("ERROR: (AuthorizationFailed) The client 'x' does not have authorization to perform action"),
            DirectoryError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_classify_conflict() {
        assert!(matches!(
            failure("ERROR: (RoleAssignmentExists) The role assignment already exists."),
            DirectoryError::Conflict(_)
        ));
    }

    #[test]
    fn test_classify_principal_not_found_is_transient() {
        assert!(matches!(
            failure("ERROR: (PrincipalNotFound) Principal 1234 does not exist in the directory 5678."),
            DirectoryError::Transient(_)
        ));
    }

    #[test]
    fn test_classify_throttling_and_5xx() {
        assert!(failure("ERROR: (TooManyRequests) Rate limit exceeded").is_transient());
        assert!(failure("ERROR: Operation returned an invalid status code 'Service Unavailable'").is_transient());
        assert!(failure("ERROR: HTTPSConnectionPool: Read timed out.").is_transient());
    }

    #[test]
    fn test_classify_status_codes_need_context() {
        assert!(failure("ERROR: Operation returned an invalid status code: 429").is_transient());
        assert!(failure("ERROR: (429) Too many requests were sent").is_transient());
        assert!(failure("ERROR: Received status code: 502 from the gateway").is_transient());
    }

    #[test]
    fn test_classify_not_found_with_digits_in_id() {
        let err = classify_failure(
            "az ad app show",
            &CommandOutput::failed(
                1,
                "ERROR: Resource '0a1b4293-4e5f-6071-8293-a4b5c6d7e8f9' does not exist or one of its queried reference-property objects are not present.",
            ),
        );
        assert!(err.is_not_found(), "classified as {err:?}");

        let err = failure("ERROR: Resource '50429000-4e5f-6071-8293-a4b5c6d7e8f9' does not exist.");
        assert!(err.is_not_found(), "classified as {err:?}");
    }

    #[test]
    fn test_classify_not_found() {
        assert!(failure("ERROR: Resource '0a1b' does not exist or one of its queried reference-property objects are not present.").is_not_found());
    }

    #[test]
    fn test_classify_other() {
        let err = failure("ERROR: unrecognized arguments: --bogus");
        assert!(matches!(
            err,
            DirectoryError::CommandFailed { status: 1, .. }
        ));
    }

    #[test]
    fn test_describe_stops_at_flags() {
        assert_eq!(
            describe(&["ad", "app", "credential", "reset", "--id", "x"]),
            "az ad app credential reset"
        );
    }
}
