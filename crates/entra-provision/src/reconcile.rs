//! Convergence of an app registration towards its desired state.
//!
//! [`reconcile`] decides what to do about the registration itself;
//! [`plan`] adds the redirect URI decision; [`apply`] carries the plan out.
//! Applying a plan and then planning again against the result always yields
//! a no-op.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use entra_directory::Directory;
use entra_types::{DesiredRegistration, ObjectId, Registration, SignInAudience};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// What to do about the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No registration with the display name exists.
    CreateNew(DesiredRegistration),
    /// The registration exists with a different audience.
    UpdateAudience(ObjectId, SignInAudience),
    /// The registration matches.
    NoOp,
}

/// Decide the action for `desired` given what the directory holds.
#[must_use]
pub fn reconcile(desired: &DesiredRegistration, observed: Option<&Registration>) -> Action {
    match observed {
        None => Action::CreateNew(desired.clone()),
        Some(existing) if existing.sign_in_audience != desired.sign_in_audience => {
            Action::UpdateAudience(existing.object_id.clone(), desired.sign_in_audience.clone())
        }
        Some(_) => Action::NoOp,
    }
}

/// How redirect URIs of an existing registration are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectPolicy {
    /// Leave them alone.
    #[default]
    Preserve,
    /// Add the desired URI if it is missing.
    Merge,
    /// Make the desired URI the only one.
    Replace,
}

impl RedirectPolicy {
    /// Lowercase name, as accepted by `REDIRECT_URI_POLICY`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }

    /// The URI set an existing registration should end up with, or `None`
    /// if the policy does not touch redirect URIs.
    fn target(self, current: &BTreeSet<String>, desired: &str) -> Option<BTreeSet<String>> {
        match self {
            Self::Preserve => None,
            Self::Merge => {
                let mut merged = current.clone();
                merged.insert(desired.to_string());
                Some(merged)
            }
            Self::Replace => Some(BTreeSet::from([desired.to_string()])),
        }
    }
}

impl fmt::Display for RedirectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedirectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!(
                "unknown redirect policy `{other}` (expected preserve, merge or replace)"
            )),
        }
    }
}

/// A change to the redirect URIs of an existing registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectChange {
    /// The registration to update.
    pub object_id: ObjectId,
    /// URIs before the change.
    pub from: BTreeSet<String>,
    /// URIs after the change.
    pub to: BTreeSet<String>,
}

/// The full set of changes for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// What to do about the registration.
    pub action: Action,
    /// What to do about its redirect URIs.
    pub redirect_change: Option<RedirectChange>,
}

impl Plan {
    /// Whether applying the plan would change nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.action == Action::NoOp && self.redirect_change.is_none()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::CreateNew(desired) => writeln!(
                f,
                "create registration `{}` (audience {}, redirect {})",
                desired.display_name, desired.sign_in_audience, desired.redirect_uri
            )?,
            Action::UpdateAudience(object_id, audience) => {
                writeln!(f, "update audience of {object_id} to {audience}")?;
            }
            Action::NoOp => writeln!(f, "registration is up to date")?,
        }
        if let Some(change) = &self.redirect_change {
            let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
            writeln!(
                f,
                "set redirect URIs of {} from [{}] to [{}]",
                change.object_id,
                join(&change.from),
                join(&change.to)
            )?;
        }
        Ok(())
    }
}

/// Combine [`reconcile`] with the redirect URI policy.
#[must_use]
pub fn plan(
    desired: &DesiredRegistration,
    observed: Option<&Registration>,
    policy: RedirectPolicy,
) -> Plan {
    let action = reconcile(desired, observed);

    let redirect_change = observed.and_then(|existing| {
        let target = policy.target(&existing.redirect_uris, &desired.redirect_uri)?;
        (target != existing.redirect_uris).then(|| RedirectChange {
            object_id: existing.object_id.clone(),
            from: existing.redirect_uris.clone(),
            to: target,
        })
    });

    Plan {
        action,
        redirect_change,
    }
}

/// Carry out `plan` and return the converged registration.
///
/// `observed` must be the registration the plan was computed from.
///
/// # Errors
///
/// Directory failures are returned as-is; a plan that updates a registration
/// without an observed one is [`Error::NotFound`].
pub fn apply<D: Directory>(
    directory: &D,
    plan: &Plan,
    observed: Option<&Registration>,
) -> Result<Registration, Error> {
    let mut registration = match (&plan.action, observed) {
        (Action::CreateNew(desired), _) => {
            let created = directory.create_registration(desired)?;
            tracing::info!(
                app_id = %created.app_id,
                object_id = %created.object_id,
                display_name = %created.display_name,
                "created app registration"
            );
            created
        }
        (Action::UpdateAudience(object_id, audience), Some(existing)) => {
            directory.update_audience(object_id, audience)?;
            tracing::info!(
                app_id = %existing.app_id,
                from = %existing.sign_in_audience,
                to = %audience,
                "updated sign-in audience"
            );
            Registration {
                sign_in_audience: audience.clone(),
                ..existing.clone()
            }
        }
        (Action::NoOp, Some(existing)) => {
            tracing::info!(app_id = %existing.app_id, "app registration already up to date");
            existing.clone()
        }
        (_, None) => {
            return Err(Error::NotFound(
                "plan refers to a registration that was not observed".into(),
            ));
        }
    };

    if let Some(change) = &plan.redirect_change {
        directory.set_redirect_uris(&change.object_id, &change.to)?;
        tracing::info!(
            app_id = %registration.app_id,
            count = change.to.len(),
            "updated redirect URIs"
        );
        registration.redirect_uris = change.to.clone();
    }

    Ok(registration)
}
