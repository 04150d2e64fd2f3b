//! Read-only validation of an existing app registration.
//!
//! The report answers one question: is this registration usable as a
//! multitenant API client, and if not, which `az` command fixes it.

use std::fmt;

use entra_directory::Directory;
use entra_types::{AppId, AudienceClass, SignInAudience};
use serde::Serialize;

use crate::config::check_redirect_uri;
use crate::error::Error;

/// Result of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Nothing to do.
    Pass,
    /// Works, but probably not as intended.
    Warn,
    /// Will not work as a multitenant client.
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
        })
    }
}

/// One line item of a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    /// Short name: `audience`, `service_principal` or `redirect_uris`.
    pub name: &'static str,
    /// Outcome.
    pub status: CheckStatus,
    /// One-line explanation.
    pub summary: String,
    /// Supporting detail lines.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Command that fixes the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Check {
    fn new(name: &'static str, status: CheckStatus, summary: impl Into<String>) -> Self {
        Self {
            name,
            status,
            summary: summary.into(),
            details: Vec::new(),
            remediation: None,
        }
    }

    fn detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }

    fn remediation(mut self, command: impl Into<String>) -> Self {
        self.remediation = Some(command.into());
        self
    }
}

/// Validation findings for one registration.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// The validated application id.
    pub app_id: AppId,
    /// Registration display name.
    pub display_name: String,
    /// Raw sign-in audience.
    pub sign_in_audience: SignInAudience,
    /// Its classification.
    pub audience_class: AudienceClass,
    /// The checks, in report order.
    pub checks: Vec<Check>,
}

impl ValidationReport {
    /// The most severe status across all checks.
    #[must_use]
    pub fn worst(&self) -> CheckStatus {
        self.checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass)
    }

    /// Look up a check by name.
    #[must_use]
    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Only if serialization itself fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "App registration validation")?;
        writeln!(f, "===========================")?;
        writeln!(f, "Application id:   {}", self.app_id)?;
        writeln!(f, "Display name:     {}", self.display_name)?;
        writeln!(
            f,
            "Sign-in audience: {} ({})",
            self.sign_in_audience, self.audience_class
        )?;

        for check in &self.checks {
            writeln!(f)?;
            writeln!(
                f,
                "[{}] {}: {}",
                check.status.to_string().to_uppercase(),
                check.name,
                check.summary
            )?;
            for line in &check.details {
                writeln!(f, "    {line}")?;
            }
            if let Some(command) = &check.remediation {
                writeln!(f, "    fix: {command}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Overall: {}", self.worst())
    }
}

fn audience_fix(app_id: &AppId) -> String {
    format!("az ad app update --id {app_id} --sign-in-audience AzureADMultipleOrgs")
}

fn audience_check(app_id: &AppId, audience: &SignInAudience) -> Check {
    let class = audience.class();
    match class {
        AudienceClass::Multitenant => Check::new(
            "audience",
            CheckStatus::Pass,
            "multitenant: accounts from any organization can sign in",
        ),
        AudienceClass::MultitenantAndPersonal => Check::new(
            "audience",
            CheckStatus::Pass,
            "multitenant+personal: accounts from any organization can sign in",
        )
        .detail("personal Microsoft accounts are also allowed"),
        AudienceClass::SingleTenant => Check::new(
            "audience",
            CheckStatus::Warn,
            "single-tenant: only accounts in the home tenant can sign in",
        )
        .remediation(audience_fix(app_id)),
        AudienceClass::PersonalOnly => Check::new(
            "audience",
            CheckStatus::Fail,
            "personal-only: organizational accounts cannot sign in",
        )
        .remediation(audience_fix(app_id)),
        AudienceClass::Unknown => Check::new(
            "audience",
            CheckStatus::Warn,
            format!("unknown: unrecognized sign-in audience `{audience}`"),
        ),
    }
}

fn redirect_check<'a>(app_id: &AppId, uris: impl ExactSizeIterator<Item = &'a String>) -> Check {
    if uris.len() == 0 {
        return Check::new("redirect_uris", CheckStatus::Warn, "no web redirect URIs configured")
            .remediation(format!(
                "az ad app update --id {app_id} --web-redirect-uris <uri>"
            ));
    }

    let mut check = Check::new("redirect_uris", CheckStatus::Pass, String::new());
    let mut insecure = 0;
    for uri in uris {
        match check_redirect_uri(uri) {
            Ok(()) => check.details.push(uri.clone()),
            Err(reason) => {
                insecure += 1;
                check.details.push(format!("{uri} (insecure: {reason})"));
            }
        }
    }

    let count = check.details.len();
    if insecure > 0 {
        check.status = CheckStatus::Warn;
        check.summary = format!("{count} configured, {insecure} not HTTPS outside localhost");
    } else {
        check.summary = format!("{count} configured");
    }
    check
}

/// Validate the registration with application id `app_id`.
///
/// The id is checked before any directory call. Warnings and failures are
/// part of a successful report; only usage and lookup problems are errors.
///
/// # Errors
///
/// [`Error::Usage`] for a malformed id, [`Error::NotFound`] if no
/// registration has that id, or any directory failure.
pub fn validate<D: Directory>(directory: &D, app_id: &str) -> Result<ValidationReport, Error> {
    let app_id = AppId::parse(app_id).map_err(|e| Error::Usage(e.to_string()))?;

    let registration = directory
        .get_registration(&app_id)?
        .ok_or_else(|| Error::NotFound(format!("no app registration with application id {app_id}")))?;

    let principal = directory.find_service_principal(&app_id)?;

    let mut checks = vec![audience_check(&app_id, &registration.sign_in_audience)];
    checks.push(match principal {
        Some(sp) => Check::new(
            "service_principal",
            CheckStatus::Pass,
            format!("present (object id {})", sp.object_id),
        ),
        None => Check::new(
            "service_principal",
            CheckStatus::Warn,
            "missing: the app cannot be granted roles in this tenant",
        )
        .remediation(format!("az ad sp create --id {app_id}")),
    });
    checks.push(redirect_check(&app_id, registration.redirect_uris.iter()));

    let report = ValidationReport {
        audience_class: registration.sign_in_audience.class(),
        app_id,
        display_name: registration.display_name,
        sign_in_audience: registration.sign_in_audience,
        checks,
    };
    tracing::info!(
        app_id = %report.app_id,
        audience = %report.audience_class,
        result = %report.worst(),
        "validation finished"
    );
    Ok(report)
}
